mod concurrency;
mod lifecycle;
mod resolution;
mod routes;

use std::sync::Arc;

use workflow_schemes::build_in_memory_manager;
use workflow_schemes::events::BroadcastEventPublisher;
use workflow_schemes::migration::MigrationTaskRegistry;
use workflow_schemes::scheme::{ProjectId, SchemeMapping, WorkflowScheme};
use workflow_schemes::services::WorkflowSchemeManager;
use workflow_schemes::store::memory::InMemoryProjectSchemeAssociations;
use workflow_schemes::store::{Project, ProjectSchemeAssociations};

pub struct Fixture {
    pub manager: Arc<WorkflowSchemeManager>,
    pub migrations: Arc<MigrationTaskRegistry>,
    pub projects: Arc<InMemoryProjectSchemeAssociations>,
    pub events: Arc<BroadcastEventPublisher>,
}

impl Fixture {
    pub fn new() -> Self {
        let events = Arc::new(BroadcastEventPublisher::default());
        let (manager, migrations, projects) = build_in_memory_manager(events.clone());
        Self {
            manager,
            migrations,
            projects,
            events,
        }
    }

    pub fn add_project(&self, id: ProjectId) {
        self.projects.add_project(project(id));
    }

    pub fn bind(&self, project_id: ProjectId, scheme: &WorkflowScheme) {
        self.projects
            .associate(project_id, scheme.id.unwrap())
            .unwrap();
    }

    pub fn create(&self, name: &str, entries: &[(Option<&str>, &str)]) -> WorkflowScheme {
        let scheme = WorkflowScheme::assignable_builder(name)
            .mapping(&mapping(entries))
            .build();
        self.manager.create_scheme(&scheme).unwrap()
    }
}

pub fn project(id: ProjectId) -> Project {
    Project {
        id,
        project_key: format!("P{}", id),
        name: format!("Project {}", id),
    }
}

pub fn mapping(entries: &[(Option<&str>, &str)]) -> SchemeMapping {
    SchemeMapping::from_entries(
        entries
            .iter()
            .map(|(issue_type, workflow)| (issue_type.map(str::to_string), workflow.to_string())),
    )
    .unwrap()
}
