//! In-memory store backends.
//!
//! Used by the test-suite and by embedders that do not need durability.
//! Every operation holds the table lock for its whole duration, so multi-row
//! writes like `rename_workflow` are atomic to other callers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;

use super::{
    AssignableSchemeStore, AssignableState, DraftSchemeStore, DraftState, Project,
    ProjectSchemeAssociations, pick_single_draft,
};
use crate::error::{AppError, AppResult};
use crate::scheme::{ProjectId, SchemeId};

pub struct InMemoryAssignableSchemeStore {
    schemes: RwLock<BTreeMap<SchemeId, AssignableState>>,
    next_id: AtomicI64,
}

impl InMemoryAssignableSchemeStore {
    pub fn new() -> Self {
        Self {
            schemes: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(10000),
        }
    }

    pub fn len(&self) -> usize {
        self.schemes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.read().is_empty()
    }
}

impl Default for InMemoryAssignableSchemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignableSchemeStore for InMemoryAssignableSchemeStore {
    fn create(&self, mut state: AssignableState) -> AppResult<AssignableState> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.id = Some(id);
        self.schemes.write().insert(id, state.clone());
        Ok(state)
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<AssignableState>> {
        Ok(self.schemes.read().get(&id).cloned())
    }

    fn get_by_name(&self, name: &str) -> AppResult<Option<AssignableState>> {
        Ok(self
            .schemes
            .read()
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    fn get_all(&self) -> AppResult<Vec<AssignableState>> {
        Ok(self.schemes.read().values().cloned().collect())
    }

    fn update(&self, state: AssignableState) -> AppResult<AssignableState> {
        let id = state.require_id()?;
        let mut schemes = self.schemes.write();
        match schemes.get_mut(&id) {
            Some(existing) => {
                *existing = state.clone();
                Ok(state)
            }
            None => Err(AppError::not_found(format!("workflow scheme {}", id))),
        }
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        Ok(self.schemes.write().remove(&id).is_some())
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        let mut schemes = self.schemes.write();
        let mut changed = false;
        for state in schemes.values_mut() {
            let (renamed, did_change) = state.mapping.with_workflow_renamed(old, new);
            if did_change {
                state.mapping = renamed;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<AssignableState>> {
        Ok(self
            .schemes
            .read()
            .values()
            .filter(|s| s.mapping.uses_workflow(workflow))
            .cloned()
            .collect())
    }
}

pub struct InMemoryDraftSchemeStore {
    drafts: RwLock<BTreeMap<SchemeId, DraftState>>,
    next_id: AtomicI64,
}

impl InMemoryDraftSchemeStore {
    pub fn new() -> Self {
        Self {
            drafts: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(20000),
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.read().is_empty()
    }
}

impl Default for InMemoryDraftSchemeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftSchemeStore for InMemoryDraftSchemeStore {
    fn create(&self, mut state: DraftState) -> AppResult<DraftState> {
        let mut drafts = self.drafts.write();
        if drafts.values().any(|d| d.parent_id == state.parent_id) {
            return Err(AppError::invalid_argument("scheme already has draft"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        state.id = Some(id);
        state.last_modified_date = Utc::now();
        drafts.insert(id, state.clone());
        Ok(state)
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<DraftState>> {
        Ok(self.drafts.read().get(&id).cloned())
    }

    fn get_draft_for_parent(&self, parent_id: SchemeId) -> AppResult<Option<DraftState>> {
        let found: Vec<DraftState> = self
            .drafts
            .read()
            .values()
            .filter(|d| d.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(pick_single_draft(parent_id, found))
    }

    fn update(&self, mut state: DraftState) -> AppResult<DraftState> {
        let id = state.require_id()?;
        let mut drafts = self.drafts.write();
        match drafts.get_mut(&id) {
            Some(existing) => {
                if existing.parent_id != state.parent_id {
                    return Err(AppError::invalid_argument(
                        "draft parent cannot be changed",
                    ));
                }
                state.last_modified_date = Utc::now();
                *existing = state.clone();
                Ok(state)
            }
            None => Err(AppError::not_found(format!("draft workflow scheme {}", id))),
        }
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        Ok(self.drafts.write().remove(&id).is_some())
    }

    fn delete_by_parent_id(&self, parent_id: SchemeId) -> AppResult<bool> {
        let mut drafts = self.drafts.write();
        let before = drafts.len();
        drafts.retain(|_, d| d.parent_id != parent_id);
        Ok(drafts.len() != before)
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        let mut drafts = self.drafts.write();
        let mut changed = false;
        for state in drafts.values_mut() {
            let (renamed, did_change) = state.mapping.with_workflow_renamed(old, new);
            if did_change {
                state.mapping = renamed;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<DraftState>> {
        Ok(self
            .drafts
            .read()
            .values()
            .filter(|d| d.mapping.uses_workflow(workflow))
            .cloned()
            .collect())
    }
}

pub struct InMemoryProjectSchemeAssociations {
    projects: DashMap<ProjectId, Project>,
    associations: DashMap<ProjectId, SchemeId>,
}

impl InMemoryProjectSchemeAssociations {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
            associations: DashMap::new(),
        }
    }

    pub fn add_project(&self, project: Project) {
        self.projects.insert(project.id, project);
    }
}

impl Default for InMemoryProjectSchemeAssociations {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectSchemeAssociations for InMemoryProjectSchemeAssociations {
    fn all_projects(&self) -> AppResult<Vec<Project>> {
        let mut projects: Vec<Project> = self.projects.iter().map(|p| p.value().clone()).collect();
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }

    fn get_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.projects.get(&project_id).map(|p| p.value().clone()))
    }

    fn scheme_for_project(&self, project_id: ProjectId) -> AppResult<Option<SchemeId>> {
        Ok(self.associations.get(&project_id).map(|s| *s.value()))
    }

    fn projects_using_scheme(&self, scheme_id: SchemeId) -> AppResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .associations
            .iter()
            .filter(|entry| *entry.value() == scheme_id)
            .filter_map(|entry| self.projects.get(entry.key()).map(|p| p.value().clone()))
            .collect();
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }

    fn associate(&self, project_id: ProjectId, scheme_id: SchemeId) -> AppResult<()> {
        if !self.projects.contains_key(&project_id) {
            return Err(AppError::not_found(format!("project {}", project_id)));
        }
        self.associations.insert(project_id, scheme_id);
        Ok(())
    }

    fn dissociate(&self, project_id: ProjectId) -> AppResult<bool> {
        Ok(self.associations.remove(&project_id).is_some())
    }
}
