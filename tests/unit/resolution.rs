use super::Fixture;
use workflow_schemes::error::AppError;
use workflow_schemes::scheme::SYSTEM_WORKFLOW_NAME;

#[test]
fn project_without_scheme_resolves_through_default_scheme() {
    let fx = Fixture::new();
    fx.add_project(1);

    let scheme = fx.manager.get_scheme_for_project(1).unwrap();
    assert!(scheme.is_default());
    assert!(fx.manager.is_using_default_scheme(1).unwrap());
    assert_eq!(fx.manager.get_workflow_name(1, Some("bug")).unwrap(), SYSTEM_WORKFLOW_NAME);
    assert_eq!(
        fx.manager.get_workflow_map(1).unwrap().get_actual_default_workflow(),
        SYSTEM_WORKFLOW_NAME
    );
}

#[test]
fn explicit_entry_then_scheme_default_then_system_workflow() {
    let fx = Fixture::new();
    fx.add_project(1);
    fx.add_project(2);
    let with_default = fx.create("Dev", &[(None, "wf-default"), (Some("bug"), "wf-bug")]);
    let without_default = fx.create("Ops", &[(Some("task"), "wf-task")]);
    fx.bind(1, &with_default);
    fx.bind(2, &without_default);

    assert_eq!(fx.manager.get_workflow_name(1, Some("bug")).unwrap(), "wf-bug");
    assert_eq!(fx.manager.get_workflow_name(1, Some("story")).unwrap(), "wf-default");
    assert_eq!(fx.manager.get_workflow_name(1, None).unwrap(), "wf-default");
    assert_eq!(fx.manager.get_workflow_name(2, Some("task")).unwrap(), "wf-task");
    assert_eq!(fx.manager.get_workflow_name(2, Some("bug")).unwrap(), SYSTEM_WORKFLOW_NAME);
    assert!(!fx.manager.is_using_default_scheme(1).unwrap());
}

#[test]
fn unknown_project_is_not_found() {
    let fx = Fixture::new();
    let err = fx.manager.get_scheme_for_project(404).unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn bulk_resolution_skips_failing_projects() {
    let fx = Fixture::new();
    fx.add_project(1);
    fx.add_project(2);
    let scheme = fx.create("Dev", &[(Some("bug"), "wf-bug")]);
    fx.bind(2, &scheme);

    let resolved = fx.manager.resolve_workflows_for_projects(&[1, 2, 99], Some("bug"));
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved.get(&1).map(String::as_str), Some(SYSTEM_WORKFLOW_NAME));
    assert_eq!(resolved.get(&2).map(String::as_str), Some("wf-bug"));
    assert!(!resolved.contains_key(&99));
}

#[test]
fn projects_using_default_and_named_schemes() {
    let fx = Fixture::new();
    for id in 1..=3 {
        fx.add_project(id);
    }
    let scheme = fx.create("Dev", &[(None, "wf")]);
    fx.bind(3, &scheme);

    let default = fx.manager.get_default_workflow_scheme();
    let on_default: Vec<i64> = fx
        .manager
        .get_projects_using(&default)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(on_default, vec![1, 2]);

    let on_scheme = fx.manager.get_projects_using(&scheme).unwrap();
    assert_eq!(on_scheme.len(), 1);
    assert_eq!(on_scheme[0].id, 3);
}

#[test]
fn activity_follows_project_bindings() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf")]);
    let default = fx.manager.get_default_workflow_scheme();

    assert!(!fx.manager.is_active(&scheme).unwrap());
    assert!(!fx.manager.is_active(&default).unwrap());

    fx.add_project(1);
    assert!(fx.manager.is_active(&default).unwrap());

    fx.manager.assign_scheme_to_project(1, &scheme).unwrap();
    assert!(fx.manager.is_active(&scheme).unwrap());
    assert!(!fx.manager.is_active(&default).unwrap());

    let draft = fx.manager.create_draft_of(None, &scheme).unwrap();
    assert!(!fx.manager.is_active(&draft).unwrap());
}

#[test]
fn assignable_schemes_are_sorted_by_name() {
    let fx = Fixture::new();
    fx.create("charlie", &[]);
    fx.create("Alpha", &[]);
    fx.create("bravo", &[]);

    let names: Vec<String> = fx
        .manager
        .get_assignable_schemes()
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "bravo", "charlie"]);
    assert!(fx.manager.get_scheme_by_name("bravo").unwrap().is_some());
    assert!(fx.manager.get_scheme_by_name("delta").unwrap().is_none());
}

#[test]
fn active_workflow_names_are_recomputed_after_mutations() {
    let fx = Fixture::new();
    fx.add_project(1);
    let scheme = fx.create("Dev", &[(None, "wf-default"), (Some("bug"), "wf-bug")]);

    let names = fx.manager.get_active_workflow_names().unwrap();
    assert_eq!(names.iter().collect::<Vec<_>>(), vec![SYSTEM_WORKFLOW_NAME]);

    fx.manager.assign_scheme_to_project(1, &scheme).unwrap();
    let names = fx.manager.get_active_workflow_names().unwrap();
    assert!(names.contains("wf-default"));
    assert!(names.contains("wf-bug"));
    assert!(!names.contains(SYSTEM_WORKFLOW_NAME));

    fx.manager.rename_workflow("wf-bug", "wf-defect").unwrap();
    let names = fx.manager.get_active_workflow_names().unwrap();
    assert!(names.contains("wf-defect"));
    assert!(!names.contains("wf-bug"));
}
