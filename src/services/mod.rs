pub mod context;
pub mod workflow_schemes_service;

pub use context::RequestContext;
pub use workflow_schemes_service::{SchemeLifecycleState, WorkflowSchemeManager};
