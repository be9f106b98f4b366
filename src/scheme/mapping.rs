//! Issue type to workflow mappings.
//!
//! The `None` key is the scheme's default: it governs every issue type that
//! has no explicit entry. When a scheme has no default either, resolution
//! falls back to [`SYSTEM_WORKFLOW_NAME`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Name of the built-in workflow every unresolved issue type falls back to.
pub const SYSTEM_WORKFLOW_NAME: &str = "jira";

/// Maximum length, in characters, of an issue type id or workflow name.
pub const MAX_MAPPING_FIELD_LENGTH: usize = 255;

/// Issue type id that stands for the default entry in persisted mappings.
/// It can never be used as an explicit key.
pub const DEFAULT_ISSUE_TYPE_KEY: &str = "0";

/// Immutable issue type → workflow map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemeMapping {
    mappings: BTreeMap<Option<String>, String>,
}

impl SchemeMapping {
    pub fn builder() -> MappingBuilder {
        MappingBuilder::default()
    }

    /// Mapping used by the Default Scheme: everything goes to the system workflow.
    pub fn system_default() -> Self {
        let mut mappings = BTreeMap::new();
        mappings.insert(None, SYSTEM_WORKFLOW_NAME.to_string());
        Self { mappings }
    }

    /// Builds a mapping from raw entries, validating the whole batch first.
    pub fn from_entries<I, K, V>(entries: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (Option<K>, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut builder = MappingBuilder::default();
        builder.set_mappings(entries)?;
        Ok(builder.build())
    }

    /// Workflow governing `issue_type`: explicit entry, then the scheme
    /// default, then the system workflow.
    pub fn get_actual_workflow(&self, issue_type: Option<&str>) -> &str {
        if let Some(issue_type) = issue_type {
            if let Some(workflow) = self.mappings.get(&Some(issue_type.to_string())) {
                return workflow;
            }
        }
        self.mappings
            .get(&None)
            .map(String::as_str)
            .unwrap_or(SYSTEM_WORKFLOW_NAME)
    }

    pub fn get_actual_default_workflow(&self) -> &str {
        self.get_actual_workflow(None)
    }

    /// Explicit entry for `issue_type` (or the default entry for `None`), without fallback.
    pub fn configured_workflow(&self, issue_type: Option<&str>) -> Option<&str> {
        self.mappings
            .get(&issue_type.map(str::to_string))
            .map(String::as_str)
    }

    pub fn default_workflow(&self) -> Option<&str> {
        self.configured_workflow(None)
    }

    pub fn entries(&self) -> &BTreeMap<Option<String>, String> {
        &self.mappings
    }

    pub fn issue_type_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings
            .iter()
            .filter_map(|(key, workflow)| key.as_deref().map(|k| (k, workflow.as_str())))
    }

    pub fn uses_workflow(&self, workflow: &str) -> bool {
        self.mappings.values().any(|w| w == workflow)
    }

    pub fn workflows(&self) -> impl Iterator<Item = &str> {
        self.mappings.values().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Copy of this mapping with every `old` value replaced by `new`.
    pub fn with_workflow_renamed(&self, old: &str, new: &str) -> (Self, bool) {
        let mut changed = false;
        let mappings = self
            .mappings
            .iter()
            .map(|(key, workflow)| {
                if workflow == old {
                    changed = true;
                    (key.clone(), new.to_string())
                } else {
                    (key.clone(), workflow.clone())
                }
            })
            .collect();
        (Self { mappings }, changed)
    }

    pub fn to_builder(&self) -> MappingBuilder {
        MappingBuilder {
            mappings: self.mappings.clone(),
        }
    }
}

/// Mutable staging area for a [`SchemeMapping`]. Every mutation validates its
/// input and leaves the builder untouched when it fails.
#[derive(Debug, Clone, Default)]
pub struct MappingBuilder {
    mappings: BTreeMap<Option<String>, String>,
}

impl MappingBuilder {
    pub fn set_mapping(&mut self, issue_type: &str, workflow: &str) -> AppResult<&mut Self> {
        validate_issue_type(issue_type)?;
        validate_mapping_field("workflow name", workflow)?;
        self.mappings
            .insert(Some(issue_type.to_string()), workflow.to_string());
        Ok(self)
    }

    pub fn set_default_workflow(&mut self, workflow: &str) -> AppResult<&mut Self> {
        validate_mapping_field("workflow name", workflow)?;
        self.mappings.insert(None, workflow.to_string());
        Ok(self)
    }

    /// Replaces the whole mapping. The batch is validated before anything is
    /// applied, so a single bad entry keeps the previous state.
    pub fn set_mappings<I, K, V>(&mut self, entries: I) -> AppResult<&mut Self>
    where
        I: IntoIterator<Item = (Option<K>, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut staged = BTreeMap::new();
        for (issue_type, workflow) in entries {
            let issue_type = issue_type.map(Into::into);
            let workflow = workflow.into();
            if let Some(ref key) = issue_type {
                validate_issue_type(key)?;
            }
            validate_mapping_field("workflow name", &workflow)?;
            staged.insert(issue_type, workflow);
        }
        self.mappings = staged;
        Ok(self)
    }

    pub fn remove_mapping(&mut self, issue_type: &str) -> &mut Self {
        self.mappings.remove(&Some(issue_type.to_string()));
        self
    }

    pub fn remove_default(&mut self) -> &mut Self {
        self.mappings.remove(&None);
        self
    }

    pub fn clear_mappings(&mut self) -> &mut Self {
        self.mappings.clear();
        self
    }

    /// Drops every entry, the default included, pointing at `workflow`.
    pub fn remove_workflow(&mut self, workflow: &str) -> &mut Self {
        self.mappings.retain(|_, w| w != workflow);
        self
    }

    pub fn build(&self) -> SchemeMapping {
        SchemeMapping {
            mappings: self.mappings.clone(),
        }
    }
}

/// Shared rule for issue type ids and workflow names.
pub fn validate_mapping_field(kind: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_argument(format!(
            "{} must not be blank",
            kind
        )));
    }
    if value.chars().count() > MAX_MAPPING_FIELD_LENGTH {
        return Err(AppError::invalid_argument(format!(
            "{} is too long (max {} characters)",
            kind, MAX_MAPPING_FIELD_LENGTH
        )));
    }
    Ok(())
}

/// Issue type ids follow the shared field rule and may not take the reserved default key.
pub fn validate_issue_type(issue_type: &str) -> AppResult<()> {
    validate_mapping_field("issue type", issue_type)?;
    if issue_type.trim() == DEFAULT_ISSUE_TYPE_KEY {
        return Err(AppError::invalid_argument(format!(
            "issue type '{}' is reserved for the default workflow",
            DEFAULT_ISSUE_TYPE_KEY
        )));
    }
    Ok(())
}

/// Wire form of a mapping. JSON object keys cannot be null, so the default
/// entry travels in its own field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_workflow: Option<String>,
    #[serde(default)]
    pub issue_type_mappings: BTreeMap<String, String>,
}

impl From<&SchemeMapping> for MappingDto {
    fn from(mapping: &SchemeMapping) -> Self {
        Self {
            default_workflow: mapping.default_workflow().map(str::to_string),
            issue_type_mappings: mapping
                .issue_type_entries()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl TryFrom<MappingDto> for SchemeMapping {
    type Error = AppError;

    fn try_from(dto: MappingDto) -> AppResult<Self> {
        let entries = dto
            .default_workflow
            .map(|w| (None::<String>, w))
            .into_iter()
            .chain(dto.issue_type_mappings.into_iter().map(|(k, v)| (Some(k), v)));
        SchemeMapping::from_entries(entries)
    }
}
