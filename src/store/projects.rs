use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::scheme::{ProjectId, SchemeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub project_key: String,
    pub name: String,
}

/// Which workflow scheme each project is bound to. A project without a row
/// uses the Default Scheme.
pub trait ProjectSchemeAssociations: Send + Sync {
    fn all_projects(&self) -> AppResult<Vec<Project>>;

    fn get_project(&self, project_id: ProjectId) -> AppResult<Option<Project>>;

    fn scheme_for_project(&self, project_id: ProjectId) -> AppResult<Option<SchemeId>>;

    fn projects_using_scheme(&self, scheme_id: SchemeId) -> AppResult<Vec<Project>>;

    /// Binds the project to `scheme_id`, replacing any previous row.
    fn associate(&self, project_id: ProjectId, scheme_id: SchemeId) -> AppResult<()>;

    /// Removes the project's row so it falls back to the Default Scheme.
    fn dissociate(&self, project_id: ProjectId) -> AppResult<bool>;

    fn any_project_without_scheme(&self) -> AppResult<bool> {
        for project in self.all_projects()? {
            if self.scheme_for_project(project.id)?.is_none() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
