use crate::db::models::api::{ApiResponse, error_codes};
use crate::scheme::SchemeId;
use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// An edit targeted a scheme with an active migration task. Callers should
    /// retry later or tell the user; it is never retried automatically.
    #[error("Workflow scheme is being migrated")]
    SchemeIsBeingMigrated { scheme_id: Option<SchemeId> },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, response) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Database error"),
                )
            }
            AppError::Pool(ref e) => {
                tracing::error!("Connection pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Connection error"),
                )
            }
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Cache broadcast error"),
                )
            }
            AppError::InvalidArgument { ref message } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::<()>::bad_request(message),
            ),
            AppError::SchemeIsBeingMigrated { scheme_id } => {
                let message = match scheme_id {
                    Some(id) => format!("Workflow scheme {} is being migrated", id),
                    None => "Workflow scheme is being migrated".to_string(),
                };
                (
                    StatusCode::CONFLICT,
                    ApiResponse::<()>::conflict(&message, None, error_codes::SCHEME_IS_BEING_MIGRATED),
                )
            }
            AppError::NotFound { ref resource } => (
                StatusCode::NOT_FOUND,
                ApiResponse::<()>::not_found(&format!("{} not found", resource)),
            ),
            AppError::Config(ref e) => {
                tracing::error!("Configuration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error("Configuration error"),
                )
            }
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::<()>::internal_error(message),
                )
            }
        };

        (status, Json(response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn being_migrated(scheme_id: Option<SchemeId>) -> Self {
        Self::SchemeIsBeingMigrated { scheme_id }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Failures coming from the record store or the broadcast channel.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Pool(_) | AppError::Redis(_)
        )
    }

    pub fn is_being_migrated(&self) -> bool {
        matches!(self, AppError::SchemeIsBeingMigrated { .. })
    }
}
