use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::AppState;
use crate::cache::{ClearCacheSignal, publish_clear_cache};
use crate::db::models::api::{ApiResponse, ResponseMeta};
use crate::error::{AppError, AppResult};
use crate::scheme::{ProjectId, SchemeId, WorkflowScheme, WorkflowSchemeResponse};
use crate::services::{RequestContext, SchemeLifecycleState};
use crate::validation::ValidatedJson;
use crate::validation::workflow_scheme::{AssignSchemeRequest, DraftRequest, SchemeRequest, WorkflowQuery};

#[derive(Serialize)]
pub struct WorkflowResolution {
    pub scheme_id: Option<SchemeId>,
    pub issue_type: Option<String>,
    pub workflow: String,
}

#[derive(Serialize)]
pub struct SchemeStateResponse {
    pub scheme_id: SchemeId,
    pub state: SchemeLifecycleState,
}

#[derive(Serialize)]
pub struct ClearCacheResponse {
    pub node_id: uuid::Uuid,
    /// Other nodes that received the signal. `None` when running standalone.
    pub receivers: Option<usize>,
}

fn require_scheme(state: &AppState, id: SchemeId) -> AppResult<WorkflowScheme> {
    state
        .manager
        .get_workflow_scheme(id)?
        .ok_or_else(|| AppError::not_found(format!("workflow scheme {}", id)))
}

fn require_draft(state: &AppState, parent: &WorkflowScheme) -> AppResult<WorkflowScheme> {
    state.manager.get_draft_for_parent(parent)?.ok_or_else(|| {
        AppError::not_found(format!("draft of workflow scheme {}", parent.id.unwrap_or_default()))
    })
}

pub async fn list_schemes(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> AppResult<impl IntoResponse> {
    let schemes: Vec<WorkflowSchemeResponse> = state
        .manager
        .get_assignable_schemes()?
        .iter()
        .map(WorkflowSchemeResponse::from)
        .collect();

    let meta = ResponseMeta {
        request_id: ctx.request_id.clone(),
        total_count: Some(schemes.len() as i64),
    };
    let response = ApiResponse::success_with_meta(schemes, "Workflow schemes retrieved successfully", meta);
    Ok((StatusCode::OK, Json(response)))
}

pub async fn create_scheme(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<SchemeRequest>,
) -> AppResult<impl IntoResponse> {
    let scheme = WorkflowScheme::assignable_builder(payload.name.trim())
        .description(payload.description.clone())
        .mapping(&payload.mapping()?)
        .build();
    let created = state.manager.create_scheme(&scheme)?;

    let response = ApiResponse::created(
        WorkflowSchemeResponse::from(&created),
        "Workflow scheme created successfully",
    );
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_scheme(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
) -> AppResult<impl IntoResponse> {
    let scheme = require_scheme(&state, scheme_id)?;
    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&scheme),
        "Workflow scheme retrieved successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn update_scheme(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
    ValidatedJson(payload): ValidatedJson<SchemeRequest>,
) -> AppResult<impl IntoResponse> {
    let existing = require_scheme(&state, scheme_id)?;
    let scheme = existing
        .to_builder()
        .name(payload.name.trim())
        .description(payload.description.clone())
        .mapping(&payload.mapping()?)
        .build();
    let updated = state.manager.update_workflow_scheme(&scheme)?;

    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&updated),
        "Workflow scheme updated successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn delete_scheme(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
) -> AppResult<impl IntoResponse> {
    let scheme = require_scheme(&state, scheme_id)?;
    state.manager.delete_workflow_scheme(&scheme)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::<()>::ok("Workflow scheme deleted successfully")),
    ))
}

pub async fn get_scheme_state(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
) -> AppResult<impl IntoResponse> {
    let scheme = WorkflowScheme::assignable_builder("").id(scheme_id).build();
    let lifecycle = state.manager.scheme_state(&scheme)?;
    let response = ApiResponse::success(
        SchemeStateResponse {
            scheme_id,
            state: lifecycle,
        },
        "Workflow scheme state retrieved successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn resolve_scheme_workflow(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
    Query(query): Query<WorkflowQuery>,
) -> AppResult<impl IntoResponse> {
    let scheme = require_scheme(&state, scheme_id)?;
    let issue_type = query.issue_type.filter(|t| !t.trim().is_empty());
    let workflow = scheme.get_actual_workflow(issue_type.as_deref()).to_string();

    let response = ApiResponse::success(
        WorkflowResolution {
            scheme_id: scheme.id,
            issue_type,
            workflow,
        },
        "Workflow resolved successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
    ctx: RequestContext,
) -> AppResult<impl IntoResponse> {
    let parent = require_scheme(&state, scheme_id)?;
    let draft = state.manager.create_draft_of(ctx.actor(), &parent)?;
    let response = ApiResponse::created(
        WorkflowSchemeResponse::from(&draft),
        "Draft workflow scheme created successfully",
    );
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
) -> AppResult<impl IntoResponse> {
    let parent = require_scheme(&state, scheme_id)?;
    let draft = require_draft(&state, &parent)?;
    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&draft),
        "Draft workflow scheme retrieved successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<DraftRequest>,
) -> AppResult<impl IntoResponse> {
    let parent = require_scheme(&state, scheme_id)?;
    let draft = require_draft(&state, &parent)?;
    let edited = draft.to_builder().mapping(&payload.mapping()?).build();
    let updated = state.manager.update_draft_workflow_scheme(ctx.actor(), &edited)?;

    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&updated),
        "Draft workflow scheme updated successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn delete_draft(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
) -> AppResult<impl IntoResponse> {
    let parent = require_scheme(&state, scheme_id)?;
    let draft = require_draft(&state, &parent)?;
    state.manager.delete_workflow_scheme(&draft)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::<()>::ok("Draft workflow scheme deleted successfully")),
    ))
}

pub async fn publish_draft(
    State(state): State<Arc<AppState>>,
    Path(scheme_id): Path<SchemeId>,
) -> AppResult<impl IntoResponse> {
    let parent = require_scheme(&state, scheme_id)?;
    let draft = require_draft(&state, &parent)?;
    let published = state.manager.replace_scheme_with_draft(&draft)?;
    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&published),
        "Draft workflow scheme published successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn get_project_scheme(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<ProjectId>,
) -> AppResult<impl IntoResponse> {
    let scheme = state.manager.get_scheme_for_project(project_id)?;
    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&scheme),
        "Project workflow scheme retrieved successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn assign_project_scheme(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<ProjectId>,
    ValidatedJson(payload): ValidatedJson<AssignSchemeRequest>,
) -> AppResult<impl IntoResponse> {
    let scheme = match payload.scheme_id {
        Some(scheme_id) => require_scheme(&state, scheme_id)?,
        None => state.manager.get_default_workflow_scheme(),
    };
    state.manager.assign_scheme_to_project(project_id, &scheme)?;

    let response = ApiResponse::success(
        WorkflowSchemeResponse::from(&scheme),
        "Project workflow scheme updated successfully",
    );
    Ok((StatusCode::OK, Json(response)))
}

pub async fn cleanup_project_draft(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<ProjectId>,
    ctx: RequestContext,
) -> AppResult<impl IntoResponse> {
    let copy = state.manager.clean_up_scheme_draft(project_id, ctx.actor())?;
    let message = if copy.is_some() {
        "Draft copied into a new workflow scheme"
    } else {
        "No draft to clean up"
    };
    let response = ApiResponse::success(copy.as_ref().map(WorkflowSchemeResponse::from), message);
    Ok((StatusCode::OK, Json(response)))
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.manager.clear_caches();

    let receivers = match &state.redis {
        Some(client) => {
            let signal = ClearCacheSignal::new(state.node_id);
            match publish_clear_cache(client, &state.cache_clear_channel, &signal).await {
                Ok(receivers) => Some(receivers),
                Err(err) => {
                    warn!(error = %err, "Local caches cleared but the signal could not be broadcast");
                    return err.into_response();
                }
            }
        }
        None => None,
    };

    let response = ApiResponse::success(
        ClearCacheResponse {
            node_id: state.node_id,
            receivers,
        },
        "Workflow scheme caches cleared",
    );
    (StatusCode::OK, Json(response)).into_response()
}
