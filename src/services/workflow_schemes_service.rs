//! Workflow scheme manager: resolution, lifecycle and draft orchestration.
//!
//! Writes to one scheme are serialized through a per-scheme lock (a draft
//! locks its parent). The lock is not reentrant, so nothing in here calls a
//! locking operation while already holding a scheme's lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::KeyedLocks;
use crate::error::{AppError, AppResult};
use crate::events::{EventPublisher, SchemeEvent};
use crate::migration::MigrationGuard;
use crate::scheme::{
    MAX_MAPPING_FIELD_LENGTH, ProjectId, SYSTEM_WORKFLOW_NAME, SchemeId, SchemeMapping,
    WorkflowScheme, validate_mapping_field,
};
use crate::store::{
    AssignableSchemeStore, AssignableState, DraftSchemeStore, DraftState, Project,
    ProjectSchemeAssociations,
};

/// Where a scheme id currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeLifecycleState {
    NonExistent,
    AssignableNoDraft,
    AssignableWithDraft,
    Draft,
    Migrating,
}

pub struct WorkflowSchemeManager {
    schemes: Arc<dyn AssignableSchemeStore>,
    drafts: Arc<dyn DraftSchemeStore>,
    projects: Arc<dyn ProjectSchemeAssociations>,
    guard: MigrationGuard,
    events: Arc<dyn EventPublisher>,
    scheme_locks: KeyedLocks<SchemeId>,
    active_workflows: Mutex<Option<Arc<BTreeSet<String>>>>,
}

fn abbreviate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut abbreviated: String = value.chars().take(max_chars.saturating_sub(3)).collect();
    abbreviated.push_str("...");
    abbreviated
}

fn validate_scheme_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_argument("scheme.name must not be blank"));
    }
    if name.chars().count() > MAX_MAPPING_FIELD_LENGTH {
        return Err(AppError::invalid_argument(format!(
            "scheme.name must be at most {} characters",
            MAX_MAPPING_FIELD_LENGTH
        )));
    }
    Ok(())
}

/// Description given to a scheme copied from a draft of `parent`.
pub fn description_for_copy(parent: &WorkflowScheme) -> String {
    let mut description = String::new();
    if let Some(existing) = parent.description.as_deref().filter(|d| !d.trim().is_empty()) {
        description.push_str(existing);
        description.push(' ');
    }
    description.push_str(&format!(
        "(This copy was automatically generated from a draft, when workflow scheme '{}' was made inactive.)",
        parent.name
    ));
    description
}

impl WorkflowSchemeManager {
    pub fn new(
        schemes: Arc<dyn AssignableSchemeStore>,
        drafts: Arc<dyn DraftSchemeStore>,
        projects: Arc<dyn ProjectSchemeAssociations>,
        guard: MigrationGuard,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            schemes,
            drafts,
            projects,
            guard,
            events,
            scheme_locks: KeyedLocks::new(),
            active_workflows: Mutex::new(None),
        }
    }

    fn publish(&self, event: SchemeEvent) {
        self.events.publish(event);
    }

    fn reset_active_workflows(&self) {
        *self.active_workflows.lock() = None;
    }

    fn with_scheme_lock<R>(&self, id: SchemeId, f: impl FnOnce() -> AppResult<R>) -> AppResult<R> {
        self.scheme_locks.with_lock(&id, f)
    }

    fn draft_to_scheme(&self, state: DraftState) -> AppResult<WorkflowScheme> {
        let parent = self
            .schemes
            .get(state.parent_id)?
            .ok_or_else(|| AppError::not_found(format!("parent workflow scheme {}", state.parent_id)))?;
        Ok(state.into_scheme(&parent))
    }

    // ---- lookups -------------------------------------------------------

    pub fn get_default_workflow_scheme(&self) -> WorkflowScheme {
        WorkflowScheme::default_scheme()
    }

    pub fn get_workflow_scheme(&self, id: SchemeId) -> AppResult<Option<WorkflowScheme>> {
        Ok(self.schemes.get(id)?.map(AssignableState::into_scheme))
    }

    pub fn get_scheme_by_name(&self, name: &str) -> AppResult<Option<WorkflowScheme>> {
        Ok(self.schemes.get_by_name(name)?.map(AssignableState::into_scheme))
    }

    /// Every assignable scheme, ordered by name.
    pub fn get_assignable_schemes(&self) -> AppResult<Vec<WorkflowScheme>> {
        let mut schemes: Vec<WorkflowScheme> = self
            .schemes
            .get_all()?
            .into_iter()
            .map(AssignableState::into_scheme)
            .collect();
        schemes.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(schemes)
    }

    fn require_project(&self, project_id: ProjectId) -> AppResult<Project> {
        self.projects
            .get_project(project_id)?
            .ok_or_else(|| AppError::not_found(format!("project {}", project_id)))
    }

    /// The project's scheme, or the Default Scheme when it has none.
    pub fn get_scheme_for_project(&self, project_id: ProjectId) -> AppResult<WorkflowScheme> {
        self.require_project(project_id)?;
        let Some(scheme_id) = self.projects.scheme_for_project(project_id)? else {
            return Ok(WorkflowScheme::default_scheme());
        };
        match self.schemes.get(scheme_id)? {
            Some(state) => Ok(state.into_scheme()),
            None => {
                warn!(project_id, scheme_id, "Project points at a missing workflow scheme, using the default");
                Ok(WorkflowScheme::default_scheme())
            }
        }
    }

    pub fn is_using_default_scheme(&self, project_id: ProjectId) -> AppResult<bool> {
        self.require_project(project_id)?;
        Ok(self.projects.scheme_for_project(project_id)?.is_none())
    }

    pub fn get_workflow_name(&self, project_id: ProjectId, issue_type: Option<&str>) -> AppResult<String> {
        let scheme = self.get_scheme_for_project(project_id)?;
        Ok(scheme.get_actual_workflow(issue_type).to_string())
    }

    pub fn get_workflow_map(&self, project_id: ProjectId) -> AppResult<SchemeMapping> {
        Ok(self.get_scheme_for_project(project_id)?.mapping)
    }

    /// Resolves one issue type for many projects. A project that fails to
    /// resolve is logged and left out of the result.
    pub fn resolve_workflows_for_projects(
        &self,
        project_ids: &[ProjectId],
        issue_type: Option<&str>,
    ) -> BTreeMap<ProjectId, String> {
        let mut resolved = BTreeMap::new();
        for &project_id in project_ids {
            match self.get_workflow_name(project_id, issue_type) {
                Ok(workflow) => {
                    resolved.insert(project_id, workflow);
                }
                Err(e) => warn!(project_id, error = %e, "Skipping project whose workflow could not be resolved"),
            }
        }
        resolved
    }

    pub fn get_projects_using(&self, scheme: &WorkflowScheme) -> AppResult<Vec<Project>> {
        if scheme.is_default() {
            let mut using = Vec::new();
            for project in self.projects.all_projects()? {
                if self.projects.scheme_for_project(project.id)?.is_none() {
                    using.push(project);
                }
            }
            return Ok(using);
        }
        match scheme.id {
            Some(id) if !scheme.is_draft() => self.projects.projects_using_scheme(id),
            _ => Ok(Vec::new()),
        }
    }

    /// Drafts are never active. The Default Scheme is active while any project
    /// lacks an explicit scheme; a named scheme while any project points at it.
    pub fn is_active(&self, scheme: &WorkflowScheme) -> AppResult<bool> {
        if scheme.is_draft() {
            return Ok(false);
        }
        if scheme.is_default() {
            return self.projects.any_project_without_scheme();
        }
        let Some(id) = scheme.id else {
            return Ok(false);
        };
        if self.schemes.get(id)?.is_none() {
            return Ok(false);
        }
        Ok(!self.projects.projects_using_scheme(id)?.is_empty())
    }

    pub fn scheme_state(&self, scheme: &WorkflowScheme) -> AppResult<SchemeLifecycleState> {
        let Some(id) = scheme.id else {
            return Ok(if scheme.is_default() {
                SchemeLifecycleState::AssignableNoDraft
            } else {
                SchemeLifecycleState::NonExistent
            });
        };
        if scheme.is_draft() {
            return Ok(match self.drafts.get(id)? {
                Some(_) => SchemeLifecycleState::Draft,
                None => SchemeLifecycleState::NonExistent,
            });
        }
        if self.schemes.get(id)?.is_none() {
            return Ok(SchemeLifecycleState::NonExistent);
        }
        if self.guard.is_migrating(scheme)? {
            return Ok(SchemeLifecycleState::Migrating);
        }
        if self.drafts.has_draft_for_parent(id)? {
            Ok(SchemeLifecycleState::AssignableWithDraft)
        } else {
            Ok(SchemeLifecycleState::AssignableNoDraft)
        }
    }

    // ---- assignable schemes --------------------------------------------

    pub fn create_scheme(&self, scheme: &WorkflowScheme) -> AppResult<WorkflowScheme> {
        if scheme.is_default() {
            return Err(AppError::invalid_argument("cannot create the default scheme"));
        }
        if scheme.is_draft() {
            return Err(AppError::invalid_argument("use create_draft to create drafts"));
        }
        validate_scheme_name(&scheme.name)?;

        let saved = self.schemes.create(AssignableState::new(
            scheme.name.clone(),
            scheme.description.clone(),
            scheme.mapping.clone(),
        ))?;
        let id = saved.require_id()?;
        info!(scheme_id = id, name = %saved.name, "Created workflow scheme");
        self.publish(SchemeEvent::SchemeCreated {
            scheme_id: id,
            name: saved.name.clone(),
        });
        self.reset_active_workflows();
        Ok(saved.into_scheme())
    }

    pub fn update_workflow_scheme(&self, scheme: &WorkflowScheme) -> AppResult<WorkflowScheme> {
        let id = scheme.require_assignable_id("scheme")?;
        validate_scheme_name(&scheme.name)?;

        let updated = self.with_scheme_lock(id, || {
            self.guard.check_scheme(scheme)?;
            if self.schemes.get(id)?.is_none() {
                return Err(AppError::not_found(format!("workflow scheme {}", id)));
            }
            self.schemes.update(AssignableState {
                id: Some(id),
                name: scheme.name.clone(),
                description: scheme.description.clone(),
                mapping: scheme.mapping.clone(),
            })
        })?;

        info!(scheme_id = id, "Updated workflow scheme");
        self.publish(SchemeEvent::SchemeUpdated { scheme_id: id });
        self.reset_active_workflows();
        Ok(updated.into_scheme())
    }

    /// Deletes an inactive scheme and its draft. Given a draft, deletes only
    /// the draft and returns `false`.
    pub fn delete_workflow_scheme(&self, scheme: &WorkflowScheme) -> AppResult<bool> {
        if scheme.is_default() {
            return Err(AppError::invalid_argument("scheme must not be the default scheme"));
        }
        let id = scheme
            .id
            .ok_or_else(|| AppError::invalid_argument("scheme.id must not be null"))?;

        if let Some(parent_id) = scheme.parent_id() {
            self.with_scheme_lock(parent_id, || {
                self.guard.check_draft(scheme)?;
                self.drafts.delete(id)
            })?;
            info!(draft_id = id, parent_id, "Deleted draft workflow scheme");
            self.publish(SchemeEvent::DraftDeleted {
                draft_id: id,
                parent_id,
            });
            return Ok(false);
        }

        let draft_deleted = self.with_scheme_lock(id, || {
            if self.is_active(scheme)? {
                return Err(AppError::invalid_argument("Cannot delete active scheme."));
            }
            self.guard.check_scheme(scheme)?;
            self.schemes.delete(id)?;
            self.drafts.delete_by_parent_id(id)
        })?;

        info!(scheme_id = id, name = %scheme.name, draft_deleted, "Deleted workflow scheme");
        self.publish(SchemeEvent::SchemeDeleted {
            scheme_id: id,
            name: scheme.name.clone(),
        });
        self.reset_active_workflows();
        Ok(true)
    }

    // ---- drafts --------------------------------------------------------

    pub fn has_draft(&self, scheme: &WorkflowScheme) -> AppResult<bool> {
        if scheme.is_default() || scheme.is_draft() {
            return Ok(false);
        }
        match scheme.id {
            Some(id) => self.drafts.has_draft_for_parent(id),
            None => Ok(false),
        }
    }

    pub fn get_draft_for_parent(&self, scheme: &WorkflowScheme) -> AppResult<Option<WorkflowScheme>> {
        if scheme.is_default() || scheme.is_draft() {
            return Ok(None);
        }
        let Some(parent_id) = scheme.id else {
            return Ok(None);
        };
        match self.drafts.get_draft_for_parent(parent_id)? {
            Some(state) => self.draft_to_scheme(state).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_draft(&self, draft_id: SchemeId) -> AppResult<Option<WorkflowScheme>> {
        match self.drafts.get(draft_id)? {
            Some(state) => self.draft_to_scheme(state).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_parent_for_draft(&self, draft_id: SchemeId) -> AppResult<Option<WorkflowScheme>> {
        match self.drafts.get_parent_id(draft_id)? {
            Some(parent_id) => self.get_workflow_scheme(parent_id),
            None => Ok(None),
        }
    }

    /// Creates a draft copying `parent`'s mappings.
    pub fn create_draft_of(&self, actor: Option<&str>, parent: &WorkflowScheme) -> AppResult<WorkflowScheme> {
        let parent_id = parent.require_assignable_id("workflowScheme")?;
        let state = self.with_scheme_lock(parent_id, || {
            if self.schemes.get(parent_id)?.is_none() {
                return Err(AppError::invalid_argument(format!(
                    "workflow scheme {} does not exist",
                    parent_id
                )));
            }
            self.drafts.create_draft_of(actor, Some(parent))
        })?;
        self.after_draft_created(state)
    }

    /// Creates a draft with the mappings of `draft`, against its stated parent.
    pub fn create_draft(&self, actor: Option<&str>, draft: &WorkflowScheme) -> AppResult<WorkflowScheme> {
        let parent_id = draft
            .parent_id()
            .ok_or_else(|| AppError::invalid_argument("workflowScheme.parentScheme must not be null"))?;
        let state = self.with_scheme_lock(parent_id, || {
            if self.schemes.get(parent_id)?.is_none() {
                return Err(AppError::invalid_argument(format!(
                    "workflow scheme {} does not exist",
                    parent_id
                )));
            }
            if self.drafts.has_draft_for_parent(parent_id)? {
                return Err(AppError::invalid_argument("scheme already has draft"));
            }
            self.drafts.create(DraftState::new(
                parent_id,
                draft.mapping.clone(),
                actor.map(str::to_string),
            ))
        })?;
        self.after_draft_created(state)
    }

    fn after_draft_created(&self, state: DraftState) -> AppResult<WorkflowScheme> {
        let draft_id = state.require_id()?;
        info!(draft_id, parent_id = state.parent_id, "Created draft workflow scheme");
        self.publish(SchemeEvent::DraftCreated {
            draft_id,
            parent_id: state.parent_id,
        });
        self.draft_to_scheme(state)
    }

    pub fn update_draft_workflow_scheme(
        &self,
        actor: Option<&str>,
        draft: &WorkflowScheme,
    ) -> AppResult<WorkflowScheme> {
        let parent_id = draft
            .parent_id()
            .ok_or_else(|| AppError::invalid_argument("scheme must be a draft"))?;
        let id = draft
            .id
            .ok_or_else(|| AppError::invalid_argument("scheme.id must not be null"))?;

        let updated = self.with_scheme_lock(parent_id, || {
            self.guard.check_draft(draft)?;
            let saved = self.drafts.get(id)?.ok_or_else(|| {
                AppError::invalid_argument(format!("scheme with id {} does not exist.", id))
            })?;
            self.drafts.update(DraftState {
                mapping: draft.mapping.clone(),
                last_modified_user: actor.map(str::to_string),
                ..saved
            })
        })?;

        debug!(draft_id = id, parent_id, "Updated draft workflow scheme");
        self.publish(SchemeEvent::DraftUpdated {
            draft_id: id,
            parent_id,
        });
        self.draft_to_scheme(updated)
    }

    /// "Copy of X", then "Copy 2 of X", "Copy 3 of X"... until the name is free.
    pub fn name_for_copy(&self, original: &str) -> AppResult<String> {
        let mut name = abbreviate(&format!("Copy of {}", original), MAX_MAPPING_FIELD_LENGTH);
        let mut suffix = 2;
        while self.schemes.get_by_name(&name)?.is_some() {
            name = abbreviate(
                &format!("Copy {} of {}", suffix, original),
                MAX_MAPPING_FIELD_LENGTH,
            );
            suffix += 1;
        }
        Ok(name)
    }

    pub fn copy_draft(
        &self,
        draft: &WorkflowScheme,
        actor: Option<&str>,
        description: Option<String>,
    ) -> AppResult<WorkflowScheme> {
        if !draft.is_draft() {
            return Err(AppError::invalid_argument("scheme must be a draft"));
        }
        let copy = WorkflowScheme::assignable_builder(self.name_for_copy(&draft.name)?)
            .description(description)
            .mapping(&draft.mapping)
            .build();
        let created = self.create_scheme(&copy)?;
        info!(actor = ?actor, draft_id = ?draft.id, scheme_id = ?created.id, "Copied draft into new workflow scheme");
        Ok(created)
    }

    /// Publishes `draft` onto its parent and then deletes it.
    pub fn replace_scheme_with_draft(&self, draft: &WorkflowScheme) -> AppResult<WorkflowScheme> {
        let draft_id = draft
            .id
            .ok_or_else(|| AppError::invalid_argument("draft.id must not be null"))?;
        if !draft.is_draft() {
            return Err(AppError::invalid_argument("scheme must be a draft"));
        }
        let parent = self
            .get_parent_for_draft(draft_id)?
            .ok_or_else(|| AppError::not_found(format!("parent of draft workflow scheme {}", draft_id)))?;

        let published = parent.to_builder().mapping(&draft.mapping).build();
        let updated = self.update_workflow_scheme(&published)?;
        self.delete_workflow_scheme(draft)?;
        Ok(updated)
    }

    /// Turns the draft of a project's scheme into a standalone scheme when the
    /// project is the scheme's only user. Returns `None` when there is nothing
    /// to do.
    pub fn clean_up_scheme_draft(
        &self,
        project_id: ProjectId,
        actor: Option<&str>,
    ) -> AppResult<Option<WorkflowScheme>> {
        let scheme = self.get_scheme_for_project(project_id)?;
        if scheme.is_default() {
            return Ok(None);
        }
        if self.get_projects_using(&scheme)?.len() > 1 {
            return Ok(None);
        }
        let Some(draft) = self.get_draft_for_parent(&scheme)? else {
            return Ok(None);
        };

        self.guard.check_draft(&draft)?;
        let copy = self.copy_draft(&draft, actor, Some(description_for_copy(&scheme)))?;
        if let Err(err) = self.delete_workflow_scheme(&draft) {
            // A migration may have started after the check; the copy must not outlive the draft.
            if let Err(rollback) = self.delete_workflow_scheme(&copy) {
                warn!(copy_id = ?copy.id, error = %rollback, "Could not remove copy after failed draft cleanup");
            }
            return Err(err);
        }
        info!(project_id, scheme_id = ?scheme.id, copy_id = ?copy.id, "Cleaned up workflow scheme draft");
        Ok(Some(copy))
    }

    // ---- projects ------------------------------------------------------

    /// Binds the project to `scheme`. Passing the Default Scheme removes the
    /// project's explicit binding instead.
    pub fn assign_scheme_to_project(&self, project_id: ProjectId, scheme: &WorkflowScheme) -> AppResult<()> {
        if scheme.is_default() {
            self.remove_scheme_from_project(project_id)?;
            return Ok(());
        }
        let scheme_id = scheme.require_assignable_id("scheme")?;
        self.require_project(project_id)?;
        if self.schemes.get(scheme_id)?.is_none() {
            return Err(AppError::not_found(format!("workflow scheme {}", scheme_id)));
        }

        let previous = self.projects.scheme_for_project(project_id)?;
        if previous == Some(scheme_id) {
            return Ok(());
        }
        self.projects.associate(project_id, scheme_id)?;
        if previous.is_some() {
            self.publish(SchemeEvent::SchemeRemovedFromProject {
                scheme_id: previous,
                project_id,
            });
        }
        info!(project_id, scheme_id, "Assigned workflow scheme to project");
        self.publish(SchemeEvent::SchemeAddedToProject {
            scheme_id,
            project_id,
        });
        self.reset_active_workflows();
        Ok(())
    }

    pub fn remove_scheme_from_project(&self, project_id: ProjectId) -> AppResult<bool> {
        self.require_project(project_id)?;
        let previous = self.projects.scheme_for_project(project_id)?;
        let removed = self.projects.dissociate(project_id)?;
        if removed {
            info!(project_id, scheme_id = ?previous, "Removed workflow scheme from project");
            self.publish(SchemeEvent::SchemeRemovedFromProject {
                scheme_id: previous,
                project_id,
            });
            self.reset_active_workflows();
        }
        Ok(removed)
    }

    // ---- workflows -----------------------------------------------------

    pub fn get_schemes_for_workflow_including_drafts(&self, workflow: &str) -> AppResult<Vec<WorkflowScheme>> {
        if workflow == SYSTEM_WORKFLOW_NAME {
            return Err(AppError::invalid_argument("Can't get schemes for system workflow"));
        }
        let mut schemes: Vec<WorkflowScheme> = self
            .schemes
            .get_schemes_using_workflow(workflow)?
            .into_iter()
            .map(AssignableState::into_scheme)
            .collect();
        for draft in self.drafts.get_schemes_using_workflow(workflow)? {
            schemes.push(self.draft_to_scheme(draft)?);
        }
        Ok(schemes)
    }

    /// Rewrites every mapping to `old`, defaults included, in schemes and drafts.
    pub fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        validate_mapping_field("oldWorkflowName", old)?;
        validate_mapping_field("newWorkflowName", new)?;

        let schemes_changed = self.schemes.rename_workflow(old, new)?;
        let drafts_changed = self.drafts.rename_workflow(old, new)?;
        self.reset_active_workflows();

        info!(old_name = old, new_name = new, schemes_changed, drafts_changed, "Renamed workflow in schemes");
        self.publish(SchemeEvent::WorkflowRenamed {
            old_name: old.to_string(),
            new_name: new.to_string(),
        });
        Ok(schemes_changed || drafts_changed)
    }

    /// Names of workflows used by at least one project. Computed on first use
    /// and kept until the next mutation.
    pub fn get_active_workflow_names(&self) -> AppResult<Arc<BTreeSet<String>>> {
        let mut cached = self.active_workflows.lock();
        if let Some(names) = cached.as_ref() {
            return Ok(names.clone());
        }

        let mut names = BTreeSet::new();
        let mut system_workflow_in_use = false;
        for state in self.schemes.get_all()? {
            let id = state.require_id()?;
            if self.projects.projects_using_scheme(id)?.is_empty() {
                continue;
            }
            names.extend(state.mapping.workflows().map(str::to_string));
            if state.mapping.default_workflow().is_none() {
                system_workflow_in_use = true;
            }
        }
        if system_workflow_in_use || self.projects.any_project_without_scheme()? {
            names.insert(SYSTEM_WORKFLOW_NAME.to_string());
        }

        let names = Arc::new(names);
        *cached = Some(names.clone());
        debug!(count = names.len(), "Computed active workflow names");
        Ok(names)
    }

    /// Runs `task` once no write to `scheme` is in flight, keeping writers out
    /// until it returns. `task` must not write to the same scheme.
    pub fn wait_for_updates_to_finish_and_execute<R>(
        &self,
        scheme: &WorkflowScheme,
        task: impl FnOnce() -> AppResult<R>,
    ) -> AppResult<R> {
        match scheme.id {
            Some(id) if !scheme.is_default() => self.with_scheme_lock(id, task),
            _ => task(),
        }
    }

    // ---- caches --------------------------------------------------------

    /// Drops every cached scheme, draft and the active workflow set.
    pub fn refresh_caches(&self) {
        self.schemes.refresh();
        self.drafts.refresh();
        self.reset_active_workflows();
        info!("Refreshed workflow scheme caches");
    }

    /// Local clear-cache request: refreshes and announces it.
    pub fn clear_caches(&self) {
        self.refresh_caches();
        self.publish(SchemeEvent::ClearCache);
    }
}
