use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{Fixture, mapping};
use workflow_schemes::build_manager;
use workflow_schemes::error::{AppError, AppResult};
use workflow_schemes::events::{BroadcastEventPublisher, SchemeEvent};
use workflow_schemes::scheme::{SYSTEM_WORKFLOW_NAME, SchemeId, SchemeMapping, WorkflowScheme};
use workflow_schemes::services::SchemeLifecycleState;
use workflow_schemes::store::memory::{
    InMemoryAssignableSchemeStore, InMemoryDraftSchemeStore, InMemoryProjectSchemeAssociations,
};
use workflow_schemes::store::{AssignableSchemeStore, AssignableState, ProjectSchemeAssociations};

/// Counts writes and can be told to fail `create`.
struct InstrumentedSchemeStore {
    inner: InMemoryAssignableSchemeStore,
    writes: Arc<AtomicUsize>,
    fail_create: Arc<AtomicBool>,
}

impl AssignableSchemeStore for InstrumentedSchemeStore {
    fn create(&self, state: AssignableState) -> AppResult<AssignableState> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::internal("scheme table unavailable"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
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
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(state)
    }
    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(id)
    }
    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.rename_workflow(old, new)
    }
    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<AssignableState>> {
        self.inner.get_schemes_using_workflow(workflow)
    }
}

struct Instrumented {
    fx: Fixture,
    writes: Arc<AtomicUsize>,
    fail_create: Arc<AtomicBool>,
}

fn instrumented() -> Instrumented {
    let writes = Arc::new(AtomicUsize::new(0));
    let fail_create = Arc::new(AtomicBool::new(false));
    let projects = Arc::new(InMemoryProjectSchemeAssociations::new());
    let events = Arc::new(BroadcastEventPublisher::default());
    let (manager, migrations) = build_manager(
        InstrumentedSchemeStore {
            inner: InMemoryAssignableSchemeStore::new(),
            writes: writes.clone(),
            fail_create: fail_create.clone(),
        },
        InMemoryDraftSchemeStore::new(),
        projects.clone(),
        events.clone(),
    );
    Instrumented {
        fx: Fixture {
            manager,
            migrations,
            projects,
            events,
        },
        writes,
        fail_create,
    }
}

#[test]
fn create_rejects_default_draft_and_blank_names() {
    let fx = Fixture::new();
    let default = fx.manager.get_default_workflow_scheme();
    assert!(matches!(
        fx.manager.create_scheme(&default),
        Err(AppError::InvalidArgument { .. })
    ));

    let blank = WorkflowScheme::assignable_builder("  ").build();
    assert!(fx.manager.create_scheme(&blank).is_err());

    let parent = fx.create("Dev", &[]);
    let draft = WorkflowScheme::draft_builder(&parent).unwrap().build();
    assert!(fx.manager.create_scheme(&draft).is_err());
}

#[test]
fn create_publishes_event_and_assigns_id() {
    let fx = Fixture::new();
    let mut events = fx.events.subscribe();
    let created = fx.create("Dev", &[(None, "wf")]);

    assert!(created.id.is_some());
    assert_eq!(
        events.try_recv().unwrap(),
        SchemeEvent::SchemeCreated {
            scheme_id: created.id.unwrap(),
            name: "Dev".to_string(),
        }
    );
    assert_eq!(
        fx.manager.get_workflow_scheme(created.id.unwrap()).unwrap(),
        Some(created)
    );
}

#[test]
fn update_replaces_fields_and_mappings() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(Some("bug"), "wf-bug")]);

    let edited = scheme
        .to_builder()
        .name("Development")
        .description(Some("main".into()))
        .mapping(&mapping(&[(None, "wf-default")]))
        .build();
    let updated = fx.manager.update_workflow_scheme(&edited).unwrap();

    assert_eq!(updated.name, "Development");
    let reloaded = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    assert_eq!(reloaded.get_actual_workflow(Some("bug")), "wf-default");
    assert_eq!(reloaded.description.as_deref(), Some("main"));
}

#[test]
fn update_of_missing_scheme_is_not_found() {
    let fx = Fixture::new();
    let ghost = WorkflowScheme::assignable_builder("Ghost").id(424242).build();
    assert!(matches!(
        fx.manager.update_workflow_scheme(&ghost),
        Err(AppError::NotFound { .. })
    ));
}

#[test]
fn active_scheme_cannot_be_deleted() {
    let fx = Fixture::new();
    fx.add_project(1);
    let scheme = fx.create("Dev", &[]);
    fx.manager.assign_scheme_to_project(1, &scheme).unwrap();

    let err = fx.manager.delete_workflow_scheme(&scheme).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument { ref message } if message == "Cannot delete active scheme."));
    assert!(fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().is_some());

    let default = fx.manager.get_default_workflow_scheme();
    assert!(fx.manager.delete_workflow_scheme(&default).is_err());
}

#[test]
fn deleting_scheme_removes_its_draft() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[]);
    let draft = fx.manager.create_draft_of(Some("admin"), &scheme).unwrap();

    assert!(fx.manager.delete_workflow_scheme(&scheme).unwrap());
    assert!(fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().is_none());
    assert!(fx.manager.get_draft(draft.id.unwrap()).unwrap().is_none());
}

#[test]
fn draft_lifecycle() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf-default")]);
    assert!(!fx.manager.has_draft(&scheme).unwrap());

    let draft = fx.manager.create_draft_of(Some("admin"), &scheme).unwrap();
    assert!(draft.is_draft());
    assert_eq!(draft.name, "Dev");
    assert_eq!(draft.parent_id(), scheme.id);
    assert_eq!(draft.mapping, scheme.mapping);
    assert!(fx.manager.has_draft(&scheme).unwrap());
    assert_eq!(fx.manager.get_parent_for_draft(draft.id.unwrap()).unwrap(), Some(scheme.clone()));

    let second = fx.manager.create_draft_of(Some("admin"), &scheme);
    assert!(matches!(second, Err(AppError::InvalidArgument { .. })));

    let edited = draft
        .to_builder()
        .mapping(&mapping(&[(None, "wf-new")]))
        .build();
    let updated = fx.manager.update_draft_workflow_scheme(Some("editor"), &edited).unwrap();
    assert_eq!(updated.get_actual_default_workflow(), "wf-new");
    assert_eq!(
        updated.draft_info().and_then(|i| i.last_modified_user.as_deref()),
        Some("editor")
    );
    // The parent is untouched until the draft is published.
    let parent = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    assert_eq!(parent.get_actual_default_workflow(), "wf-default");

    assert!(!fx.manager.delete_workflow_scheme(&updated).unwrap());
    assert!(!fx.manager.has_draft(&scheme).unwrap());
    assert!(fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().is_some());
}

#[test]
fn create_draft_against_explicit_parent() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf-default")]);
    let template = WorkflowScheme::draft_builder(&scheme)
        .unwrap()
        .mapping(&mapping(&[(Some("bug"), "wf-bug")]))
        .build();

    let draft = fx.manager.create_draft(Some("admin"), &template).unwrap();
    assert_eq!(draft.get_actual_workflow(Some("bug")), "wf-bug");
    assert!(fx.manager.create_draft(Some("admin"), &template).is_err());
    assert!(fx.manager.create_draft(Some("admin"), &scheme).is_err());
}

#[test]
fn default_scheme_has_no_draft() {
    let fx = Fixture::new();
    let default = fx.manager.get_default_workflow_scheme();
    assert!(fx.manager.get_draft_for_parent(&default).unwrap().is_none());
    assert!(!fx.manager.has_draft(&default).unwrap());
    assert!(fx.manager.create_draft_of(None, &default).is_err());
}

#[test]
fn publishing_draft_replaces_parent_mappings() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf-old")]);
    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();
    let draft = fx
        .manager
        .update_draft_workflow_scheme(None, &draft.to_builder().mapping(&mapping(&[(None, "wf-new")])).build())
        .unwrap();

    let published = fx.manager.replace_scheme_with_draft(&draft).unwrap();
    assert_eq!(published.id, scheme.id);
    assert_eq!(published.get_actual_default_workflow(), "wf-new");
    assert!(!fx.manager.has_draft(&published).unwrap());
}

#[test]
fn copy_names_skip_taken_names() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[]);
    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();

    let first = fx.manager.copy_draft(&draft, None, None).unwrap();
    assert_eq!(first.name, "Copy of Dev");
    let second = fx.manager.copy_draft(&draft, None, Some("again".into())).unwrap();
    assert_eq!(second.name, "Copy 2 of Dev");
    assert_eq!(second.description.as_deref(), Some("again"));
    assert_eq!(fx.manager.name_for_copy("Dev").unwrap(), "Copy 3 of Dev");

    assert!(fx.manager.copy_draft(&scheme, None, None).is_err());
}

#[test]
fn copy_names_are_abbreviated() {
    let fx = Fixture::new();
    let long = "n".repeat(255);
    let name = fx.manager.name_for_copy(&long).unwrap();
    assert_eq!(name.chars().count(), 255);
    assert!(name.starts_with("Copy of n"));
    assert!(name.ends_with("..."));
}

#[test]
fn cleanup_turns_draft_into_standalone_scheme() {
    let fx = Fixture::new();
    fx.add_project(1);
    let scheme = fx.create("Dev", &[(None, "wf-old")]);
    fx.bind(1, &scheme);
    let draft = fx.manager.create_draft_of(Some("admin"), &scheme).unwrap();
    fx.manager
        .update_draft_workflow_scheme(None, &draft.to_builder().mapping(&mapping(&[(None, "wf-new")])).build())
        .unwrap();

    let copy = fx.manager.clean_up_scheme_draft(1, Some("admin")).unwrap().unwrap();
    assert_eq!(copy.name, "Copy of Dev");
    assert_eq!(copy.get_actual_default_workflow(), "wf-new");
    assert!(copy.description.unwrap().contains("'Dev'"));
    assert!(!fx.manager.has_draft(&scheme).unwrap());
    // The project keeps its scheme.
    assert_eq!(fx.manager.get_scheme_for_project(1).unwrap().id, scheme.id);
}

#[test]
fn cleanup_is_a_no_op_without_writes() {
    let ix = instrumented();
    let fx = &ix.fx;
    for id in 1..=3 {
        fx.add_project(id);
    }
    let shared = fx.create("Shared", &[]);
    fx.bind(2, &shared);
    fx.bind(3, &shared);
    fx.manager.create_draft_of(None, &shared).unwrap();
    let lonely = fx.create("Lonely", &[]);
    fx.add_project(4);
    fx.bind(4, &lonely);

    let before = ix.writes.load(Ordering::SeqCst);
    // Default scheme, scheme used by two projects, scheme without draft.
    assert!(fx.manager.clean_up_scheme_draft(1, None).unwrap().is_none());
    assert!(fx.manager.clean_up_scheme_draft(2, None).unwrap().is_none());
    assert!(fx.manager.clean_up_scheme_draft(4, None).unwrap().is_none());
    assert_eq!(ix.writes.load(Ordering::SeqCst), before);
    assert!(fx.manager.has_draft(&shared).unwrap());
}

#[test]
fn failed_copy_keeps_the_draft() {
    let ix = instrumented();
    let fx = &ix.fx;
    fx.add_project(1);
    let scheme = fx.create("Dev", &[]);
    fx.bind(1, &scheme);
    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();

    ix.fail_create.store(true, Ordering::SeqCst);
    assert!(fx.manager.clean_up_scheme_draft(1, None).is_err());
    assert_eq!(fx.manager.get_draft(draft.id.unwrap()).unwrap().map(|d| d.id), Some(draft.id));
}

#[test]
fn rename_covers_schemes_and_drafts() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf-old"), (Some("bug"), "wf-old")]);
    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();

    assert_eq!(fx.manager.get_schemes_for_workflow_including_drafts("wf-old").unwrap().len(), 2);
    assert!(fx.manager.rename_workflow("wf-old", "wf-new").unwrap());
    assert!(!fx.manager.rename_workflow("wf-old", "wf-new").unwrap());

    let scheme = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    assert_eq!(scheme.get_actual_workflow(Some("bug")), "wf-new");
    assert_eq!(scheme.get_actual_default_workflow(), "wf-new");
    let draft = fx.manager.get_draft(draft.id.unwrap()).unwrap().unwrap();
    assert_eq!(draft.get_actual_default_workflow(), "wf-new");

    assert!(fx.manager.rename_workflow(" ", "wf").is_err());
    assert!(fx.manager.rename_workflow("wf", "").is_err());
    assert!(fx.manager.get_schemes_for_workflow_including_drafts(SYSTEM_WORKFLOW_NAME).is_err());
}

#[test]
fn rename_rejects_oversized_names_before_writing() {
    let fx = Fixture::new();
    let scheme = fx.create("S", &[(None, "old")]);
    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();

    let err = fx.manager.rename_workflow("old", &"w".repeat(300)).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument { .. }));
    assert!(fx.manager.rename_workflow(&"o".repeat(256), "new").is_err());

    let stored = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.get_actual_default_workflow(), "old");
    let draft = fx.manager.get_draft(draft.id.unwrap()).unwrap().unwrap();
    assert_eq!(draft.get_actual_default_workflow(), "old");

    let longest = "w".repeat(255);
    assert!(fx.manager.rename_workflow("old", &longest).unwrap());
    let stored = fx.manager.get_workflow_scheme(scheme.id.unwrap()).unwrap().unwrap();
    assert!(SchemeMapping::from_entries(stored.mapping.entries().clone()).is_ok());
}

#[test]
fn assigning_schemes_emits_events() {
    let fx = Fixture::new();
    fx.add_project(7);
    let first = fx.create("First", &[]);
    let second = fx.create("Second", &[]);
    let mut events = fx.events.subscribe();

    fx.manager.assign_scheme_to_project(7, &first).unwrap();
    fx.manager.assign_scheme_to_project(7, &second).unwrap();
    fx.manager
        .assign_scheme_to_project(7, &fx.manager.get_default_workflow_scheme())
        .unwrap();

    let received: Vec<SchemeEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert_eq!(
        received,
        vec![
            SchemeEvent::SchemeAddedToProject { scheme_id: first.id.unwrap(), project_id: 7 },
            SchemeEvent::SchemeRemovedFromProject { scheme_id: first.id, project_id: 7 },
            SchemeEvent::SchemeAddedToProject { scheme_id: second.id.unwrap(), project_id: 7 },
            SchemeEvent::SchemeRemovedFromProject { scheme_id: second.id, project_id: 7 },
        ]
    );
    assert!(fx.projects.scheme_for_project(7).unwrap().is_none());
}

#[test]
fn lifecycle_states() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[]);
    assert_eq!(fx.manager.scheme_state(&scheme).unwrap(), SchemeLifecycleState::AssignableNoDraft);

    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();
    assert_eq!(fx.manager.scheme_state(&scheme).unwrap(), SchemeLifecycleState::AssignableWithDraft);
    assert_eq!(fx.manager.scheme_state(&draft).unwrap(), SchemeLifecycleState::Draft);

    fx.manager.delete_workflow_scheme(&scheme).unwrap();
    assert_eq!(fx.manager.scheme_state(&scheme).unwrap(), SchemeLifecycleState::NonExistent);
    assert_eq!(fx.manager.scheme_state(&draft).unwrap(), SchemeLifecycleState::NonExistent);
}

#[test]
fn wait_for_updates_runs_task_for_any_scheme() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[]);
    let default = fx.manager.get_default_workflow_scheme();

    let value = fx.manager.wait_for_updates_to_finish_and_execute(&scheme, || Ok(41 + 1)).unwrap();
    assert_eq!(value, 42);
    let value = fx.manager.wait_for_updates_to_finish_and_execute(&default, || Ok("ran")).unwrap();
    assert_eq!(value, "ran");

    let err = fx
        .manager
        .wait_for_updates_to_finish_and_execute(&scheme, || -> AppResult<()> { Err(AppError::internal("boom")) })
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}
