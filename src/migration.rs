//! Migration tasks and the guard that keeps edits away from migrating schemes.
//!
//! Only the presence of an active task matters here; running the migration
//! itself happens elsewhere.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::scheme::{ProjectId, SchemeId, WorkflowScheme};
use crate::store::{DraftSchemeStore, DraftState, ProjectSchemeAssociations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    /// Moves projects onto a different assignable scheme.
    Scheme,
    /// Publishes a draft onto the projects using its parent.
    Draft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationTask {
    pub id: Uuid,
    pub kind: MigrationKind,
    pub scheme_id: Option<SchemeId>,
    pub project_ids: BTreeSet<ProjectId>,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationTask {
    pub fn is_active(&self) -> bool {
        self.status == TaskStatus::Running
    }
}

pub trait MigrationTaskAccessor: Send + Sync {
    /// Active task migrating projects onto `scheme` itself.
    fn get_active(&self, scheme: &WorkflowScheme) -> AppResult<Option<MigrationTask>>;

    /// Active task touching any project that uses `scheme` (or, for a draft,
    /// its parent). With `draft_only` only draft migrations count.
    fn get_active_by_projects(
        &self,
        scheme: &WorkflowScheme,
        draft_only: bool,
    ) -> AppResult<Option<MigrationTask>>;
}

/// In-process task registry.
pub struct MigrationTaskRegistry {
    tasks: DashMap<Uuid, MigrationTask>,
    projects: Arc<dyn ProjectSchemeAssociations>,
}

impl MigrationTaskRegistry {
    pub fn new(projects: Arc<dyn ProjectSchemeAssociations>) -> Self {
        Self {
            tasks: DashMap::new(),
            projects,
        }
    }

    pub fn start(
        &self,
        kind: MigrationKind,
        scheme_id: Option<SchemeId>,
        project_ids: impl IntoIterator<Item = ProjectId>,
    ) -> MigrationTask {
        let task = MigrationTask {
            id: Uuid::new_v4(),
            kind,
            scheme_id,
            project_ids: project_ids.into_iter().collect(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        };
        info!(task_id = %task.id, kind = ?kind, scheme_id = ?scheme_id, "Started workflow scheme migration");
        self.tasks.insert(task.id, task.clone());
        task
    }

    pub fn complete(&self, task_id: Uuid) -> AppResult<MigrationTask> {
        self.finish(task_id, TaskStatus::Completed)
    }

    pub fn cancel(&self, task_id: Uuid) -> AppResult<MigrationTask> {
        self.finish(task_id, TaskStatus::Cancelled)
    }

    /// Finished tasks leave the registry; the returned value is the last record of them.
    fn finish(&self, task_id: Uuid, status: TaskStatus) -> AppResult<MigrationTask> {
        let (_, mut task) = self
            .tasks
            .remove(&task_id)
            .ok_or_else(|| AppError::not_found(format!("running migration task {}", task_id)))?;
        task.status = status;
        task.finished_at = Some(Utc::now());
        info!(task_id = %task_id, status = ?status, "Finished workflow scheme migration");
        Ok(task)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Running task with this id, if any.
    pub fn get(&self, task_id: Uuid) -> Option<MigrationTask> {
        self.tasks.get(&task_id).map(|t| t.value().clone())
    }

    pub fn active_tasks(&self) -> Vec<MigrationTask> {
        let mut tasks: Vec<MigrationTask> = self
            .tasks
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by_key(|t| t.started_at);
        tasks
    }

    fn projects_for(&self, scheme: &WorkflowScheme) -> AppResult<BTreeSet<ProjectId>> {
        if scheme.is_default() {
            let mut ids = BTreeSet::new();
            for project in self.projects.all_projects()? {
                if self.projects.scheme_for_project(project.id)?.is_none() {
                    ids.insert(project.id);
                }
            }
            return Ok(ids);
        }
        let scheme_id = match scheme.parent_id().or(scheme.id) {
            Some(id) => id,
            None => return Ok(BTreeSet::new()),
        };
        Ok(self
            .projects
            .projects_using_scheme(scheme_id)?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }
}

impl MigrationTaskAccessor for MigrationTaskRegistry {
    fn get_active(&self, scheme: &WorkflowScheme) -> AppResult<Option<MigrationTask>> {
        let Some(scheme_id) = scheme.id else {
            return Ok(None);
        };
        Ok(self
            .active_tasks()
            .into_iter()
            .find(|t| t.scheme_id == Some(scheme_id)))
    }

    fn get_active_by_projects(
        &self,
        scheme: &WorkflowScheme,
        draft_only: bool,
    ) -> AppResult<Option<MigrationTask>> {
        let projects = self.projects_for(scheme)?;
        if projects.is_empty() {
            return Ok(None);
        }
        Ok(self.active_tasks().into_iter().find(|t| {
            (!draft_only || t.kind == MigrationKind::Draft)
                && !t.project_ids.is_disjoint(&projects)
        }))
    }
}

/// Fails fast with `SchemeIsBeingMigrated` when an edit would race a migration.
#[derive(Clone)]
pub struct MigrationGuard {
    accessor: Arc<dyn MigrationTaskAccessor>,
}

impl MigrationGuard {
    pub fn new(accessor: Arc<dyn MigrationTaskAccessor>) -> Self {
        Self { accessor }
    }

    pub fn check_scheme(&self, scheme: &WorkflowScheme) -> AppResult<()> {
        if let Some(task) = self.accessor.get_active(scheme)? {
            warn!(scheme_id = ?scheme.id, task_id = %task.id, "Rejecting edit of migrating workflow scheme");
            return Err(AppError::being_migrated(scheme.id));
        }
        Ok(())
    }

    /// True when a task targets the scheme or any project using it.
    pub fn is_migrating(&self, scheme: &WorkflowScheme) -> AppResult<bool> {
        Ok(self.accessor.get_active(scheme)?.is_some()
            || self.accessor.get_active_by_projects(scheme, false)?.is_some())
    }

    pub fn check_draft(&self, draft: &WorkflowScheme) -> AppResult<()> {
        if let Some(task) = self.accessor.get_active_by_projects(draft, true)? {
            warn!(
                draft_id = ?draft.id,
                parent_id = ?draft.parent_id(),
                task_id = %task.id,
                "Rejecting edit of draft whose parent is being migrated"
            );
            return Err(AppError::being_migrated(draft.parent_id()));
        }
        Ok(())
    }
}

/// Draft store that refuses updates while the draft's parent is migrating.
pub struct MigrationGuardedDraftStore<S> {
    inner: S,
    guard: MigrationGuard,
}

impl<S: DraftSchemeStore> MigrationGuardedDraftStore<S> {
    pub fn new(inner: S, guard: MigrationGuard) -> Self {
        Self { inner, guard }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, state: &DraftState) -> AppResult<()> {
        // The parent's own fields do not matter to the accessor, only its id.
        let parent = WorkflowScheme::assignable_builder("")
            .id(state.parent_id)
            .build();
        let draft = WorkflowScheme::draft_builder(&parent)?.build();
        let draft = WorkflowScheme { id: state.id, ..draft };
        self.guard.check_draft(&draft)
    }
}

impl<S: DraftSchemeStore> DraftSchemeStore for MigrationGuardedDraftStore<S> {
    fn create(&self, state: DraftState) -> AppResult<DraftState> {
        self.inner.create(state)
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<DraftState>> {
        self.inner.get(id)
    }

    fn get_draft_for_parent(&self, parent_id: SchemeId) -> AppResult<Option<DraftState>> {
        self.inner.get_draft_for_parent(parent_id)
    }

    fn update(&self, state: DraftState) -> AppResult<DraftState> {
        self.check(&state)?;
        debug!(draft_id = ?state.id, parent_id = state.parent_id, "Migration check passed");
        self.inner.update(state)
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        self.inner.delete(id)
    }

    fn delete_by_parent_id(&self, parent_id: SchemeId) -> AppResult<bool> {
        self.inner.delete_by_parent_id(parent_id)
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        self.inner.rename_workflow(old, new)
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<DraftState>> {
        self.inner.get_schemes_using_workflow(workflow)
    }

    fn refresh(&self) {
        self.inner.refresh();
    }
}
