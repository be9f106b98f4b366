use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::scheme::DEFAULT_ISSUE_TYPE_KEY;

/// Issue type column value that stands for "every other issue type".
/// Mapping validation refuses it as an explicit key, so it round-trips.
pub const ALL_ISSUE_TYPES: &str = DEFAULT_ISSUE_TYPE_KEY;

pub fn issue_type_to_column(issue_type: Option<&str>) -> &str {
    issue_type.unwrap_or(ALL_ISSUE_TYPES)
}

pub fn issue_type_from_column(issue_type: String) -> Option<String> {
    if issue_type == ALL_ISSUE_TYPES {
        None
    } else {
        Some(issue_type)
    }
}

// Assignable scheme rows
#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::schema::workflow_schemes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkflowSchemeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::workflow_schemes)]
pub struct NewWorkflowSchemeRow<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::workflow_scheme_entities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SchemeEntityRow {
    pub id: i64,
    pub scheme_id: i64,
    pub workflow: String,
    pub issue_type: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::workflow_scheme_entities)]
pub struct NewSchemeEntityRow<'a> {
    pub scheme_id: i64,
    pub workflow: &'a str,
    pub issue_type: &'a str,
}

// Draft rows
#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::schema::draft_workflow_schemes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DraftSchemeRow {
    pub id: i64,
    pub parent_id: i64,
    pub last_modified_user: Option<String>,
    pub last_modified_date: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::draft_workflow_schemes)]
pub struct NewDraftSchemeRow<'a> {
    pub parent_id: i64,
    pub last_modified_user: Option<&'a str>,
    pub last_modified_date: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::draft_workflow_scheme_entities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DraftEntityRow {
    pub id: i64,
    pub scheme_id: i64,
    pub workflow: String,
    pub issue_type: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::draft_workflow_scheme_entities)]
pub struct NewDraftEntityRow<'a> {
    pub scheme_id: i64,
    pub workflow: &'a str,
    pub issue_type: &'a str,
}

// Project rows
#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = crate::schema::projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    pub id: i64,
    pub project_key: String,
    pub name: String,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::project_workflow_schemes)]
#[diesel(primary_key(project_id))]
pub struct ProjectSchemeRow {
    pub project_id: i64,
    pub scheme_id: i64,
}
