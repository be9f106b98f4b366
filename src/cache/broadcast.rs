//! Cluster-wide clear-cache signal carried over redis pub/sub.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CLEAR_CACHE_CHANNEL: &str = "workflow_schemes:clear_cache";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCacheSignal {
    /// Node that issued the signal. Nodes skip their own signals.
    pub origin: Uuid,
    pub issued_at: DateTime<Utc>,
}

impl ClearCacheSignal {
    pub fn new(origin: Uuid) -> Self {
        Self {
            origin,
            issued_at: Utc::now(),
        }
    }
}

pub async fn publish_clear_cache(
    client: &redis::Client,
    channel: &str,
    signal: &ClearCacheSignal,
) -> AppResult<usize> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let payload = serde_json::to_string(signal)
        .map_err(|e| AppError::Internal(format!("Failed to serialize clear-cache signal: {}", e)))?;
    let receivers: usize = conn.publish(channel, payload).await?;
    info!(channel, origin = %signal.origin, receivers, "Published clear-cache signal");
    Ok(receivers)
}

/// Subscribes to `channel` and calls `on_clear` for every signal issued by
/// another node. Returns when the subscription ends.
pub async fn listen_for_clear_cache<F>(
    client: redis::Client,
    channel: String,
    origin: Uuid,
    on_clear: F,
) -> AppResult<()>
where
    F: Fn(&ClearCacheSignal) + Send + Sync,
{
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(&channel).await?;
    info!(channel = %channel, "Listening for clear-cache signals");

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable clear-cache message");
                continue;
            }
        };
        match serde_json::from_str::<ClearCacheSignal>(&payload) {
            Ok(signal) if signal.origin == origin => {
                debug!(origin = %origin, "Skipping own clear-cache signal");
            }
            Ok(signal) => {
                info!(origin = %signal.origin, issued_at = %signal.issued_at, "Clearing workflow scheme caches");
                on_clear(&signal);
            }
            Err(e) => warn!(error = %e, payload = %payload, "Ignoring malformed clear-cache message"),
        }
    }

    warn!(channel = %channel, "Clear-cache subscription ended");
    Ok(())
}
