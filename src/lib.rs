pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod middleware;
pub mod migration;
pub mod routes;
pub mod schema;
pub mod scheme;
pub mod services;
pub mod store;
pub mod validation;

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{CachingAssignableSchemeStore, CachingDraftSchemeStore};
use crate::config::Config;
use crate::db::DbPool;
use crate::events::EventPublisher;
use crate::migration::{MigrationGuard, MigrationGuardedDraftStore, MigrationTaskRegistry};
use crate::services::WorkflowSchemeManager;
use crate::store::memory::{
    InMemoryAssignableSchemeStore, InMemoryDraftSchemeStore, InMemoryProjectSchemeAssociations,
};
use crate::store::pg::{PgAssignableSchemeStore, PgDraftSchemeStore, PgProjectSchemeAssociations};
use crate::store::{AssignableSchemeStore, DraftSchemeStore, ProjectSchemeAssociations};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<WorkflowSchemeManager>,
    pub migrations: Arc<MigrationTaskRegistry>,
    /// Present when clear-cache signals are shared with other nodes.
    pub redis: Option<redis::Client>,
    pub cache_clear_channel: String,
    /// Identifies this process on the clear-cache channel.
    pub node_id: Uuid,
}

impl AppState {
    pub fn new(
        manager: Arc<WorkflowSchemeManager>,
        migrations: Arc<MigrationTaskRegistry>,
        redis: Option<redis::Client>,
        cache_clear_channel: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            migrations,
            redis,
            cache_clear_channel: cache_clear_channel.into(),
            node_id: Uuid::new_v4(),
        }
    }
}

/// Wires a manager over the given backends: caches in front of the scheme
/// and draft stores, migration checks in front of draft writes.
pub fn build_manager<A, D>(
    schemes: A,
    drafts: D,
    projects: Arc<dyn ProjectSchemeAssociations>,
    events: Arc<dyn EventPublisher>,
) -> (Arc<WorkflowSchemeManager>, Arc<MigrationTaskRegistry>)
where
    A: AssignableSchemeStore + 'static,
    D: DraftSchemeStore + 'static,
{
    let migrations = Arc::new(MigrationTaskRegistry::new(projects.clone()));
    let guard = MigrationGuard::new(migrations.clone());

    let schemes: Arc<dyn AssignableSchemeStore> = Arc::new(CachingAssignableSchemeStore::new(schemes));
    let drafts: Arc<dyn DraftSchemeStore> = Arc::new(MigrationGuardedDraftStore::new(
        CachingDraftSchemeStore::new(drafts),
        guard.clone(),
    ));

    let manager = Arc::new(WorkflowSchemeManager::new(schemes, drafts, projects, guard, events));
    (manager, migrations)
}

pub fn build_pg_manager(
    pool: DbPool,
    events: Arc<dyn EventPublisher>,
) -> (Arc<WorkflowSchemeManager>, Arc<MigrationTaskRegistry>) {
    build_manager(
        PgAssignableSchemeStore::new(pool.clone()),
        PgDraftSchemeStore::new(pool.clone()),
        Arc::new(PgProjectSchemeAssociations::new(pool)),
        events,
    )
}

/// Manager backed entirely by in-process stores. The project store is
/// returned so callers can seed projects.
pub fn build_in_memory_manager(
    events: Arc<dyn EventPublisher>,
) -> (
    Arc<WorkflowSchemeManager>,
    Arc<MigrationTaskRegistry>,
    Arc<InMemoryProjectSchemeAssociations>,
) {
    let projects = Arc::new(InMemoryProjectSchemeAssociations::new());
    let (manager, migrations) = build_manager(
        InMemoryAssignableSchemeStore::new(),
        InMemoryDraftSchemeStore::new(),
        projects.clone(),
        events,
    );
    (manager, migrations, projects)
}

pub fn init_tracing(config: &Config) {
    let level_filter = match config.log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    unsafe {
        std::env::set_var("RUST_LOG", level_filter);
    }

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .init();
        }
    }
}
