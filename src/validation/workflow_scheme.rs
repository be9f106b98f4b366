use serde::Deserialize;
use validator::Validate;

use super::rules::not_blank;
use crate::error::AppResult;
use crate::scheme::{MappingDto, SchemeId, SchemeMapping};

#[derive(Debug, Deserialize, Validate)]
pub struct SchemeRequest {
    #[validate(
        length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(length(max = 4000, message = "Description must be at most 4000 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub mappings: MappingDto,
}

impl SchemeRequest {
    /// Mapping rules (blank or oversized fields) are enforced here, not by `validator`.
    pub fn mapping(&self) -> AppResult<SchemeMapping> {
        SchemeMapping::try_from(self.mappings.clone())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DraftRequest {
    #[serde(default)]
    pub mappings: MappingDto,
}

impl DraftRequest {
    pub fn mapping(&self) -> AppResult<SchemeMapping> {
        SchemeMapping::try_from(self.mappings.clone())
    }
}

/// `scheme_id: null` puts the project back on the Default Scheme.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignSchemeRequest {
    #[validate(range(min = 1, message = "scheme_id must be positive"))]
    pub scheme_id: Option<SchemeId>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowQuery {
    pub issue_type: Option<String>,
}
