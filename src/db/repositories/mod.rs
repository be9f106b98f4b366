pub mod drafts;
pub mod project_schemes;
pub mod schemes;
