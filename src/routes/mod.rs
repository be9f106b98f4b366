pub mod workflow_schemes;

use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/workflowschemes",
            get(workflow_schemes::list_schemes).post(workflow_schemes::create_scheme),
        )
        .route(
            "/workflowschemes/:scheme_id",
            get(workflow_schemes::get_scheme)
                .put(workflow_schemes::update_scheme)
                .delete(workflow_schemes::delete_scheme),
        )
        .route(
            "/workflowschemes/:scheme_id/state",
            get(workflow_schemes::get_scheme_state),
        )
        .route(
            "/workflowschemes/:scheme_id/workflow",
            get(workflow_schemes::resolve_scheme_workflow),
        )
        .route(
            "/workflowschemes/:scheme_id/createdraft",
            post(workflow_schemes::create_draft),
        )
        .route(
            "/workflowschemes/:scheme_id/draft",
            get(workflow_schemes::get_draft)
                .put(workflow_schemes::update_draft)
                .delete(workflow_schemes::delete_draft),
        )
        .route(
            "/workflowschemes/:scheme_id/draft/publish",
            post(workflow_schemes::publish_draft),
        )
        .route(
            "/projects/:project_id/workflowscheme",
            get(workflow_schemes::get_project_scheme).put(workflow_schemes::assign_project_scheme),
        )
        .route(
            "/projects/:project_id/workflowscheme/cleanup-draft",
            post(workflow_schemes::cleanup_project_draft),
        )
        .route(
            "/admin/workflowschemes/clear-cache",
            post(workflow_schemes::clear_cache),
        )
        .with_state(state)
}
