//! Caching decorators for the scheme stores.

use tracing::debug;

use super::invalidating::{CacheStats, InvalidatingCache};
use crate::error::AppResult;
use crate::scheme::SchemeId;
use crate::store::{AssignableSchemeStore, AssignableState, DraftSchemeStore, DraftState};

pub struct CachingAssignableSchemeStore<S> {
    inner: S,
    by_id: InvalidatingCache<SchemeId, AssignableState>,
}

impl<S: AssignableSchemeStore> CachingAssignableSchemeStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            by_id: InvalidatingCache::new("workflow_schemes"),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        self.by_id.stats()
    }
}

impl<S: AssignableSchemeStore> AssignableSchemeStore for CachingAssignableSchemeStore<S> {
    fn create(&self, state: AssignableState) -> AppResult<AssignableState> {
        let created = self.inner.create(state)?;
        if let Some(id) = created.id {
            // A lookup before creation may have cached the id as absent.
            self.by_id.invalidate(&id);
        }
        Ok(created)
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<AssignableState>> {
        self.by_id.get_or_load(&id, || self.inner.get(id))
    }

    fn get_by_name(&self, name: &str) -> AppResult<Option<AssignableState>> {
        self.inner.get_by_name(name)
    }

    fn get_all(&self) -> AppResult<Vec<AssignableState>> {
        self.inner.get_all()
    }

    fn update(&self, state: AssignableState) -> AppResult<AssignableState> {
        let id = state.require_id()?;
        self.by_id.write_through(&id, || self.inner.update(state))
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        self.by_id.write_through(&id, || self.inner.delete(id))
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        self.by_id.write_all(|| self.inner.rename_workflow(old, new))
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<AssignableState>> {
        self.inner.get_schemes_using_workflow(workflow)
    }

    fn refresh(&self) {
        self.by_id.invalidate_all();
        self.inner.refresh();
    }
}

/// Drafts are cached both by their own id and by parent id. Writes always
/// take the parent's lock before the draft's.
pub struct CachingDraftSchemeStore<S> {
    inner: S,
    by_id: InvalidatingCache<SchemeId, DraftState>,
    by_parent: InvalidatingCache<SchemeId, DraftState>,
}

impl<S: DraftSchemeStore> CachingDraftSchemeStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            by_id: InvalidatingCache::new("draft_workflow_schemes"),
            by_parent: InvalidatingCache::new("draft_workflow_schemes_by_parent"),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> (CacheStats, CacheStats) {
        (self.by_id.stats(), self.by_parent.stats())
    }
}

impl<S: DraftSchemeStore> DraftSchemeStore for CachingDraftSchemeStore<S> {
    fn create(&self, state: DraftState) -> AppResult<DraftState> {
        let parent_id = state.parent_id;
        self.by_parent.write_through(&parent_id, || {
            let created = self.inner.create(state)?;
            if let Some(id) = created.id {
                self.by_id.invalidate(&id);
            }
            Ok(created)
        })
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<DraftState>> {
        self.by_id.get_or_load(&id, || self.inner.get(id))
    }

    fn get_draft_for_parent(&self, parent_id: SchemeId) -> AppResult<Option<DraftState>> {
        self.by_parent
            .get_or_load(&parent_id, || self.inner.get_draft_for_parent(parent_id))
    }

    fn update(&self, state: DraftState) -> AppResult<DraftState> {
        let id = state.require_id()?;
        let parent_id = state.parent_id;
        self.by_parent.write_through(&parent_id, || {
            self.by_id.write_through(&id, || self.inner.update(state))
        })
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        match self.inner.get_parent_id(id)? {
            Some(parent_id) => self.by_parent.write_through(&parent_id, || {
                self.by_id.write_through(&id, || self.inner.delete(id))
            }),
            None => {
                debug!(draft_id = id, "Deleting draft with no stored parent");
                self.by_id.write_through(&id, || self.inner.delete(id))
            }
        }
    }

    fn delete_by_parent_id(&self, parent_id: SchemeId) -> AppResult<bool> {
        // The ids of every draft under this parent are not known up front,
        // so the by-id cache is dropped wholesale.
        self.by_parent.write_through(&parent_id, || {
            self.by_id
                .write_all(|| self.inner.delete_by_parent_id(parent_id))
        })
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        self.by_parent
            .write_all(|| self.by_id.write_all(|| self.inner.rename_workflow(old, new)))
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<DraftState>> {
        self.inner.get_schemes_using_workflow(workflow)
    }

    fn refresh(&self) {
        self.by_parent.invalidate_all();
        self.by_id.invalidate_all();
        self.inner.refresh();
    }
}
