use clap::{Arg, Command};
use std::sync::Arc;
use uuid::Uuid;
use workflow_schemes::{
    build_pg_manager,
    cache::{ClearCacheSignal, publish_clear_cache},
    config::Config,
    db,
    error::{AppError, AppResult},
    events::TracingEventPublisher,
    init_tracing,
};

fn cli() -> Command {
    Command::new("scheme-admin")
        .about("Maintenance commands for workflow schemes")
        .subcommand_required(true)
        .subcommand(
            Command::new("clear-cache")
                .about("Tell every node to drop its workflow scheme caches"),
        )
        .subcommand(
            Command::new("rename-workflow")
                .about("Point every scheme and draft mapping from OLD to NEW")
                .arg(Arg::new("old").value_name("OLD").required(true))
                .arg(Arg::new("new").value_name("NEW").required(true)),
        )
}

async fn broadcast_clear_cache(config: &Config) -> AppResult<Option<usize>> {
    let broadcast = config.broadcast();
    let Some(url) = broadcast.redis_url else {
        return Ok(None);
    };
    let client = redis::Client::open(url)?;
    let receivers =
        publish_clear_cache(&client, &broadcast.channel, &ClearCacheSignal::new(Uuid::new_v4())).await?;
    Ok(Some(receivers))
}

async fn run() -> AppResult<()> {
    let matches = cli().get_matches();
    let config = Config::from_env()?;
    init_tracing(&config);

    match matches.subcommand() {
        Some(("clear-cache", _)) => match broadcast_clear_cache(&config).await? {
            Some(receivers) => println!("Clear-cache signal delivered to {} node(s)", receivers),
            None => {
                return Err(AppError::Config(
                    "REDIS_URL must be set to broadcast a clear-cache signal".to_string(),
                ));
            }
        },
        Some(("rename-workflow", args)) => {
            let old = args
                .get_one::<String>("old")
                .ok_or_else(|| AppError::invalid_argument("OLD is required"))?;
            let new = args
                .get_one::<String>("new")
                .ok_or_else(|| AppError::invalid_argument("NEW is required"))?;

            let pool = db::build_pool(&config.database())?;
            let (manager, _) = build_pg_manager(pool, Arc::new(TracingEventPublisher));
            let changed = manager.rename_workflow(old, new)?;
            println!(
                "Renamed workflow '{}' to '{}': {}",
                old,
                new,
                if changed { "schemes updated" } else { "no scheme used it" }
            );

            if changed && broadcast_clear_cache(&config).await?.is_none() {
                println!("REDIS_URL not set, running nodes keep their caches until restarted");
            }
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("scheme-admin: {}", e);
        std::process::exit(1);
    }
}
