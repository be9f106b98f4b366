use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::middleware::request_tracking::extract_request_id;

pub const ACTOR_HEADER: &str = "x-actor";

/// Who is acting and which request this is, for audit fields and logs.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub actor: Option<String>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn system() -> Self {
        Self::default()
    }

    pub fn for_actor(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            request_id: None,
        }
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let request_id = extract_request_id(&parts.headers);
        tracing::debug!(actor = ?actor, request_id = ?request_id, "Resolved request context");
        Ok(Self { actor, request_id })
    }
}
