use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use super::{Fixture, mapping};
use workflow_schemes::build_manager;
use workflow_schemes::cache::{CachingAssignableSchemeStore, CachingDraftSchemeStore};
use workflow_schemes::error::{AppError, AppResult};
use workflow_schemes::events::TracingEventPublisher;
use workflow_schemes::scheme::{SchemeId, SchemeMapping, WorkflowScheme};
use workflow_schemes::store::memory::{
    InMemoryAssignableSchemeStore, InMemoryDraftSchemeStore, InMemoryProjectSchemeAssociations,
};
use workflow_schemes::store::{AssignableSchemeStore, AssignableState, DraftSchemeStore, DraftState};

/// Holds every delete open long enough for a racing writer to arrive.
struct SlowDeleteStore {
    inner: InMemoryAssignableSchemeStore,
}

impl AssignableSchemeStore for SlowDeleteStore {
    fn create(&self, state: AssignableState) -> AppResult<AssignableState> {
        self.inner.create(state)
    }
    fn get(&self, id: SchemeId) -> AppResult<Option<AssignableState>> {
        self.inner.get(id)
    }
    fn get_by_name(&self, name: &str) -> AppResult<Option<AssignableState>> {
        self.inner.get_by_name(name)
    }
    fn get_all(&self) -> AppResult<Vec<AssignableState>> {
        self.inner.get_all()
    }
    fn update(&self, state: AssignableState) -> AppResult<AssignableState> {
        self.inner.update(state)
    }
    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        thread::sleep(Duration::from_millis(50));
        self.inner.delete(id)
    }
    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        self.inner.rename_workflow(old, new)
    }
    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<AssignableState>> {
        self.inner.get_schemes_using_workflow(workflow)
    }
}

struct SlowDeleteDraftStore {
    inner: InMemoryDraftSchemeStore,
}

impl DraftSchemeStore for SlowDeleteDraftStore {
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
        self.inner.update(state)
    }
    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        thread::sleep(Duration::from_millis(50));
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
}

#[test]
fn only_one_concurrent_draft_wins() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf")]);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let manager = fx.manager.clone();
            let barrier = barrier.clone();
            let scheme = scheme.clone();
            thread::spawn(move || {
                let actor = format!("user-{}", i);
                barrier.wait();
                manager.create_draft_of(Some(actor.as_str()), &scheme)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, AppError::InvalidArgument { .. })));
    assert!(fx.manager.has_draft(&scheme).unwrap());
}

#[test]
fn draft_creation_racing_parent_delete_leaves_no_orphan() {
    let projects = Arc::new(InMemoryProjectSchemeAssociations::new());
    let (manager, _) = build_manager(
        SlowDeleteStore {
            inner: InMemoryAssignableSchemeStore::new(),
        },
        InMemoryDraftSchemeStore::new(),
        projects,
        Arc::new(TracingEventPublisher),
    );
    let scheme = manager
        .create_scheme(&WorkflowScheme::assignable_builder("Doomed").build())
        .unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let deleter = {
        let (manager, barrier, scheme) = (manager.clone(), barrier.clone(), scheme.clone());
        thread::spawn(move || {
            barrier.wait();
            manager.delete_workflow_scheme(&scheme)
        })
    };
    let drafter = {
        let (manager, barrier, scheme) = (manager.clone(), barrier.clone(), scheme.clone());
        thread::spawn(move || {
            barrier.wait();
            thread::sleep(Duration::from_millis(10));
            manager.create_draft_of(None, &scheme)
        })
    };

    assert!(deleter.join().unwrap().unwrap());
    let draft = drafter.join().unwrap();
    assert!(draft.is_err());
    assert!(manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().is_none());
    assert!(!manager.has_draft(&scheme).unwrap());
}

#[test]
fn reads_never_see_stale_state_after_writes() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf-0")]);
    let writers = 4;
    let readers = 4;
    let barrier = Arc::new(Barrier::new(writers + readers));

    let mut handles = Vec::new();
    for w in 0..writers {
        let (manager, barrier, scheme) = (fx.manager.clone(), barrier.clone(), scheme.clone());
        handles.push(thread::spawn(move || {
            barrier.wait();
            for round in 0..25 {
                let workflow = format!("wf-{}-{}", w, round);
                let edited = scheme.to_builder().mapping(&mapping(&[(None, workflow.as_str())])).build();
                manager.update_workflow_scheme(&edited).unwrap();
            }
        }));
    }
    for _ in 0..readers {
        let (manager, barrier, id) = (fx.manager.clone(), barrier.clone(), scheme.id.unwrap());
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                assert!(manager.get_workflow_scheme(id).unwrap().is_some());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let cached = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    fx.manager.refresh_caches();
    let fresh = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    assert_eq!(cached, fresh);
}

#[test]
fn writers_wait_for_running_task() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf")]);
    let task_started = Arc::new(Barrier::new(2));
    let task_done = Arc::new(AtomicBool::new(false));

    let task = {
        let (manager, scheme) = (fx.manager.clone(), scheme.clone());
        let (task_started, task_done) = (task_started.clone(), task_done.clone());
        thread::spawn(move || {
            manager.wait_for_updates_to_finish_and_execute(&scheme, || {
                task_started.wait();
                thread::sleep(Duration::from_millis(50));
                task_done.store(true, Ordering::SeqCst);
                Ok(())
            })
        })
    };

    task_started.wait();
    let edited = scheme.to_builder().mapping(&mapping(&[(None, "wf-2")])).build();
    fx.manager.update_workflow_scheme(&edited).unwrap();
    assert!(task_done.load(Ordering::SeqCst));
    task.join().unwrap().unwrap();
}

#[test]
fn get_after_slow_delete_never_sees_deleted_value() {
    let store = Arc::new(CachingAssignableSchemeStore::new(SlowDeleteStore {
        inner: InMemoryAssignableSchemeStore::new(),
    }));
    let created = store
        .create(AssignableState::new("Doomed", None, SchemeMapping::default()))
        .unwrap();
    let id = created.id.unwrap();
    // Warm the cache so a stale entry would be served if it survived.
    assert!(store.get(id).unwrap().is_some());

    let barrier = Arc::new(Barrier::new(3));
    let deleter = {
        let (store, barrier) = (store.clone(), barrier.clone());
        thread::spawn(move || {
            barrier.wait();
            store.delete(id).unwrap()
        })
    };
    let reader = {
        let (store, barrier) = (store.clone(), barrier.clone());
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..20 {
                store.get(id).unwrap();
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    barrier.wait();
    assert!(deleter.join().unwrap());
    assert!(store.get(id).unwrap().is_none());
    reader.join().unwrap();
    assert!(store.get(id).unwrap().is_none());
}

#[test]
fn draft_reads_after_slow_delete_never_see_deleted_draft() {
    let parent_id: SchemeId = 42;
    let store = Arc::new(CachingDraftSchemeStore::new(SlowDeleteDraftStore {
        inner: InMemoryDraftSchemeStore::new(),
    }));
    let created = store
        .create(DraftState::new(parent_id, SchemeMapping::default(), None))
        .unwrap();
    let id = created.id.unwrap();
    // Warm both views.
    assert!(store.get(id).unwrap().is_some());
    assert!(store.get_draft_for_parent(parent_id).unwrap().is_some());

    let barrier = Arc::new(Barrier::new(3));
    let deleter = {
        let (store, barrier) = (store.clone(), barrier.clone());
        thread::spawn(move || {
            barrier.wait();
            store.delete(id).unwrap()
        })
    };
    let reader = {
        let (store, barrier) = (store.clone(), barrier.clone());
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..20 {
                store.get(id).unwrap();
                store.get_draft_for_parent(parent_id).unwrap();
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    barrier.wait();
    assert!(deleter.join().unwrap());
    reader.join().unwrap();
    assert!(store.get(id).unwrap().is_none());
    assert!(store.get_draft_for_parent(parent_id).unwrap().is_none());
    assert!(!store.has_draft_for_parent(parent_id).unwrap());
}
