use axum::{Router, Server, middleware::from_fn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use workflow_schemes::{
    AppState, build_pg_manager,
    cache::listen_for_clear_cache,
    config::Config,
    db,
    error::{AppError, AppResult},
    events::{BroadcastEventPublisher, EventPublisher, TracingEventPublisher},
    init_tracing,
    middleware::request_tracking_middleware,
    routes,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("workflow scheme service failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let pool = db::build_pool(&config.database())?;

    let events = BroadcastEventPublisher::default();
    let mut event_stream = events.subscribe();
    tokio::spawn(async move {
        loop {
            match event_stream.recv().await {
                Ok(event) => TracingEventPublisher.publish(event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (manager, migrations) = build_pg_manager(pool, Arc::new(events));

    let broadcast = config.broadcast();
    let redis = match broadcast.redis_url.as_deref() {
        Some(url) => Some(redis::Client::open(url)?),
        None => {
            info!("No REDIS_URL configured, clear-cache stays local to this node");
            None
        }
    };

    let state = Arc::new(AppState::new(
        manager.clone(),
        migrations,
        redis.clone(),
        broadcast.channel.clone(),
    ));

    if let Some(client) = redis {
        let node_id = state.node_id;
        let channel = broadcast.channel.clone();
        let manager = manager.clone();
        tokio::spawn(async move {
            let result = listen_for_clear_cache(client, channel, node_id, move |_| {
                manager.refresh_caches();
            })
            .await;
            if let Err(e) = result {
                error!(error = %e, "Clear-cache listener stopped");
            }
        });
    }

    let cors = if config.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect::<Vec<axum::http::HeaderValue>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .merge(routes::create_router(state))
        .layer(cors)
        .layer(from_fn(request_tracking_middleware));

    let addr: SocketAddr = config
        .server_address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid server address: {}", e)))?;
    info!(%addr, "Workflow scheme service listening");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))
}
