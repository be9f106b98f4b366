//! Lifecycle events published by the scheme manager.
//!
//! Publishing is fire-and-forget: a publisher never fails the operation that
//! raised the event.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::scheme::{ProjectId, SchemeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemeEvent {
    SchemeCreated { scheme_id: SchemeId, name: String },
    SchemeUpdated { scheme_id: SchemeId },
    SchemeDeleted { scheme_id: SchemeId, name: String },
    DraftCreated { draft_id: SchemeId, parent_id: SchemeId },
    DraftUpdated { draft_id: SchemeId, parent_id: SchemeId },
    DraftDeleted { draft_id: SchemeId, parent_id: SchemeId },
    SchemeAddedToProject { scheme_id: SchemeId, project_id: ProjectId },
    SchemeRemovedFromProject { scheme_id: Option<SchemeId>, project_id: ProjectId },
    WorkflowRenamed { old_name: String, new_name: String },
    ClearCache,
}

impl SchemeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SchemeEvent::SchemeCreated { .. } => "scheme_created",
            SchemeEvent::SchemeUpdated { .. } => "scheme_updated",
            SchemeEvent::SchemeDeleted { .. } => "scheme_deleted",
            SchemeEvent::DraftCreated { .. } => "draft_created",
            SchemeEvent::DraftUpdated { .. } => "draft_updated",
            SchemeEvent::DraftDeleted { .. } => "draft_deleted",
            SchemeEvent::SchemeAddedToProject { .. } => "scheme_added_to_project",
            SchemeEvent::SchemeRemovedFromProject { .. } => "scheme_removed_from_project",
            SchemeEvent::WorkflowRenamed { .. } => "workflow_renamed",
            SchemeEvent::ClearCache => "clear_cache",
        }
    }
}

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: SchemeEvent);
}

/// Writes every event to the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: SchemeEvent) {
        info!(event = event.name(), payload = ?event, "Workflow scheme event");
    }
}

/// Fans events out to in-process subscribers over a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<SchemeEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchemeEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: SchemeEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            debug!(event = name, "No subscribers for workflow scheme event");
        }
    }
}
