//! Persistence seams for workflow schemes.
//!
//! Store traits speak in typed states; each backend maps its own rows to and
//! from these at the boundary. `pg` is the diesel backend, `memory` keeps
//! everything in process.

pub mod memory;
pub mod pg;
pub mod projects;

pub use projects::{Project, ProjectSchemeAssociations};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::scheme::{DraftInfo, SchemeId, SchemeKind, SchemeMapping, WorkflowScheme};

/// Persisted form of an assignable scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignableState {
    pub id: Option<SchemeId>,
    pub name: String,
    pub description: Option<String>,
    pub mapping: SchemeMapping,
}

impl AssignableState {
    pub fn new(name: impl Into<String>, description: Option<String>, mapping: SchemeMapping) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
            mapping,
        }
    }

    pub fn require_id(&self) -> AppResult<SchemeId> {
        self.id
            .ok_or_else(|| AppError::invalid_argument("scheme.id must not be null"))
    }

    pub fn into_scheme(self) -> WorkflowScheme {
        WorkflowScheme {
            id: self.id,
            name: self.name,
            description: self.description,
            mapping: self.mapping,
            kind: SchemeKind::Assignable,
        }
    }
}

/// Persisted form of a draft. Name and description are borrowed from the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftState {
    pub id: Option<SchemeId>,
    pub parent_id: SchemeId,
    pub mapping: SchemeMapping,
    pub last_modified_user: Option<String>,
    pub last_modified_date: DateTime<Utc>,
}

impl DraftState {
    pub fn new(parent_id: SchemeId, mapping: SchemeMapping, last_modified_user: Option<String>) -> Self {
        Self {
            id: None,
            parent_id,
            mapping,
            last_modified_user,
            last_modified_date: Utc::now(),
        }
    }

    pub fn require_id(&self) -> AppResult<SchemeId> {
        self.id
            .ok_or_else(|| AppError::invalid_argument("draft.id must not be null"))
    }

    pub fn into_scheme(self, parent: &AssignableState) -> WorkflowScheme {
        WorkflowScheme {
            id: self.id,
            name: parent.name.clone(),
            description: parent.description.clone(),
            mapping: self.mapping,
            kind: SchemeKind::Draft(DraftInfo {
                parent_id: self.parent_id,
                last_modified_user: self.last_modified_user,
                last_modified_date: self.last_modified_date,
            }),
        }
    }
}

pub trait AssignableSchemeStore: Send + Sync {
    /// Persists a new scheme and returns it with its generated id.
    fn create(&self, state: AssignableState) -> AppResult<AssignableState>;

    fn get(&self, id: SchemeId) -> AppResult<Option<AssignableState>>;

    fn get_by_name(&self, name: &str) -> AppResult<Option<AssignableState>>;

    fn get_all(&self) -> AppResult<Vec<AssignableState>>;

    /// Replaces name, description and mappings of an existing scheme.
    fn update(&self, state: AssignableState) -> AppResult<AssignableState>;

    fn delete(&self, id: SchemeId) -> AppResult<bool>;

    /// Rewrites every mapping entry equal to `old`, defaults included, across all schemes.
    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool>;

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<AssignableState>>;

    /// Drops any cached state. Stores without a cache have nothing to do.
    fn refresh(&self) {}
}

pub trait DraftSchemeStore: Send + Sync {
    /// Persists a draft. Fails with `InvalidArgument` when the parent already has one.
    fn create(&self, state: DraftState) -> AppResult<DraftState>;

    fn get(&self, id: SchemeId) -> AppResult<Option<DraftState>>;

    fn get_draft_for_parent(&self, parent_id: SchemeId) -> AppResult<Option<DraftState>>;

    fn update(&self, state: DraftState) -> AppResult<DraftState>;

    fn delete(&self, id: SchemeId) -> AppResult<bool>;

    fn delete_by_parent_id(&self, parent_id: SchemeId) -> AppResult<bool>;

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool>;

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<DraftState>>;

    fn refresh(&self) {}

    fn has_draft_for_parent(&self, parent_id: SchemeId) -> AppResult<bool> {
        Ok(self.get_draft_for_parent(parent_id)?.is_some())
    }

    fn get_parent_id(&self, draft_id: SchemeId) -> AppResult<Option<SchemeId>> {
        Ok(self.get(draft_id)?.map(|draft| draft.parent_id))
    }

    /// Creates a draft copying `parent`'s mappings.
    fn create_draft_of(
        &self,
        creator: Option<&str>,
        parent: Option<&WorkflowScheme>,
    ) -> AppResult<DraftState> {
        let parent = parent.ok_or_else(|| AppError::invalid_argument("parent must not be null"))?;
        let parent_id = parent.require_assignable_id("parent")?;
        if self.has_draft_for_parent(parent_id)? {
            return Err(AppError::invalid_argument("scheme already has draft"));
        }
        self.create(DraftState::new(
            parent_id,
            parent.mapping.clone(),
            creator.map(str::to_string),
        ))
    }
}

/// Collapses the drafts found for one parent into a single answer. More than
/// one draft means the store is corrupt; the lowest id wins.
pub fn pick_single_draft(parent_id: SchemeId, mut drafts: Vec<DraftState>) -> Option<DraftState> {
    if drafts.len() > 1 {
        let ids: Vec<Option<SchemeId>> = drafts.iter().map(|d| d.id).collect();
        warn!(
            parent_id,
            draft_ids = ?ids,
            "Found more than one draft for workflow scheme, using the lowest id"
        );
    }
    drafts.sort_by_key(|d| d.id);
    drafts.into_iter().next()
}
