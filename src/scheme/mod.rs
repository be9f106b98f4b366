pub mod mapping;

pub use mapping::{
    DEFAULT_ISSUE_TYPE_KEY, MAX_MAPPING_FIELD_LENGTH, MappingBuilder, MappingDto,
    SYSTEM_WORKFLOW_NAME, SchemeMapping, validate_issue_type, validate_mapping_field,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub type SchemeId = i64;
pub type ProjectId = i64;

pub const DEFAULT_SCHEME_NAME: &str = "Default Workflow Scheme";
pub const DEFAULT_SCHEME_DESCRIPTION: &str =
    "Default workflow scheme used by projects without an explicit scheme.";

/// What kind of scheme a [`WorkflowScheme`] is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeKind {
    /// A live scheme that projects can be bound to.
    Assignable,
    /// Working copy of an assignable scheme, invisible to projects.
    Draft(DraftInfo),
    /// The id-less fallback used by projects with no scheme row.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftInfo {
    pub parent_id: SchemeId,
    pub last_modified_user: Option<String>,
    pub last_modified_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowScheme {
    pub id: Option<SchemeId>,
    pub name: String,
    pub description: Option<String>,
    pub mapping: SchemeMapping,
    pub kind: SchemeKind,
}

impl WorkflowScheme {
    pub fn assignable_builder(name: impl Into<String>) -> SchemeBuilder {
        SchemeBuilder::new(name.into(), SchemeKind::Assignable)
    }

    /// Builder for a draft of `parent`. The parent must be a persisted assignable scheme.
    pub fn draft_builder(parent: &WorkflowScheme) -> AppResult<SchemeBuilder> {
        let parent_id = parent.require_assignable_id("parent")?;
        let mut builder = SchemeBuilder::new(
            parent.name.clone(),
            SchemeKind::Draft(DraftInfo {
                parent_id,
                last_modified_user: None,
                last_modified_date: Utc::now(),
            }),
        );
        builder.description = parent.description.clone();
        builder.mapping = parent.mapping.to_builder();
        Ok(builder)
    }

    pub fn default_scheme() -> Self {
        Self {
            id: None,
            name: DEFAULT_SCHEME_NAME.to_string(),
            description: Some(DEFAULT_SCHEME_DESCRIPTION.to_string()),
            mapping: SchemeMapping::system_default(),
            kind: SchemeKind::Default,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self.kind, SchemeKind::Draft(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self.kind, SchemeKind::Default)
    }

    pub fn is_assignable(&self) -> bool {
        !self.is_draft()
    }

    pub fn draft_info(&self) -> Option<&DraftInfo> {
        match &self.kind {
            SchemeKind::Draft(info) => Some(info),
            _ => None,
        }
    }

    pub fn parent_id(&self) -> Option<SchemeId> {
        self.draft_info().map(|info| info.parent_id)
    }

    pub fn get_actual_workflow(&self, issue_type: Option<&str>) -> &str {
        self.mapping.get_actual_workflow(issue_type)
    }

    pub fn get_actual_default_workflow(&self) -> &str {
        self.mapping.get_actual_default_workflow()
    }

    /// Id of a persisted, non-default, non-draft scheme.
    pub fn require_assignable_id(&self, what: &str) -> AppResult<SchemeId> {
        if self.is_default() {
            return Err(AppError::invalid_argument(format!(
                "{} must not be the default scheme",
                what
            )));
        }
        if self.is_draft() {
            return Err(AppError::invalid_argument(format!(
                "{} must not be a draft",
                what
            )));
        }
        self.id
            .ok_or_else(|| AppError::invalid_argument(format!("{}.id must not be null", what)))
    }

    pub fn to_builder(&self) -> SchemeBuilder {
        SchemeBuilder {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            mapping: self.mapping.to_builder(),
            kind: self.kind.clone(),
        }
    }
}

/// One builder for every scheme kind; mapping rules live in [`MappingBuilder`].
#[derive(Debug, Clone)]
pub struct SchemeBuilder {
    id: Option<SchemeId>,
    name: String,
    description: Option<String>,
    mapping: MappingBuilder,
    kind: SchemeKind,
}

impl SchemeBuilder {
    fn new(name: String, kind: SchemeKind) -> Self {
        Self {
            id: None,
            name,
            description: None,
            mapping: MappingBuilder::default(),
            kind,
        }
    }

    pub fn id(mut self, id: SchemeId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn mapping(mut self, mapping: &SchemeMapping) -> Self {
        self.mapping = mapping.to_builder();
        self
    }

    pub fn last_modified_user(mut self, user: Option<String>) -> Self {
        if let SchemeKind::Draft(ref mut info) = self.kind {
            info.last_modified_user = user;
        }
        self
    }

    pub fn set_mapping(mut self, issue_type: &str, workflow: &str) -> AppResult<Self> {
        self.mapping.set_mapping(issue_type, workflow)?;
        Ok(self)
    }

    pub fn set_default_workflow(mut self, workflow: &str) -> AppResult<Self> {
        self.mapping.set_default_workflow(workflow)?;
        Ok(self)
    }

    pub fn mappings_mut(&mut self) -> &mut MappingBuilder {
        &mut self.mapping
    }

    pub fn build(self) -> WorkflowScheme {
        WorkflowScheme {
            id: self.id,
            name: self.name,
            description: self.description,
            mapping: self.mapping.build(),
            kind: self.kind,
        }
    }
}

/// JSON view of a scheme for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSchemeResponse {
    pub id: Option<SchemeId>,
    pub name: String,
    pub description: Option<String>,
    pub draft: bool,
    pub default_scheme: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SchemeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
    pub mappings: MappingDto,
}

impl From<&WorkflowScheme> for WorkflowSchemeResponse {
    fn from(scheme: &WorkflowScheme) -> Self {
        let info = scheme.draft_info();
        Self {
            id: scheme.id,
            name: scheme.name.clone(),
            description: scheme.description.clone(),
            draft: scheme.is_draft(),
            default_scheme: scheme.is_default(),
            parent_id: info.map(|i| i.parent_id),
            last_modified_user: info.and_then(|i| i.last_modified_user.clone()),
            last_modified_date: info.map(|i| i.last_modified_date),
            mappings: MappingDto::from(&scheme.mapping),
        }
    }
}
