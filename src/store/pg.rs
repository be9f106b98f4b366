//! Diesel-backed stores.
//!
//! Each call checks a connection out of the pool and does its work in one
//! transaction, so a scheme row and its mapping entities always change together.

use std::collections::BTreeMap;

use chrono::Utc;
use diesel::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use tracing::debug;

use super::{
    AssignableSchemeStore, AssignableState, DraftSchemeStore, DraftState, Project,
    ProjectSchemeAssociations, pick_single_draft,
};
use crate::db::DbPool;
use crate::db::models::workflow_scheme::{
    DraftEntityRow, DraftSchemeRow, NewDraftEntityRow, NewDraftSchemeRow, NewSchemeEntityRow,
    NewWorkflowSchemeRow, ProjectRow, ProjectSchemeRow, SchemeEntityRow, WorkflowSchemeRow,
    issue_type_from_column, issue_type_to_column,
};
use crate::db::repositories::drafts::DraftsRepo;
use crate::db::repositories::project_schemes::ProjectSchemesRepo;
use crate::db::repositories::schemes::SchemesRepo;
use crate::error::{AppError, AppResult};
use crate::scheme::{ProjectId, SchemeId, SchemeMapping};

fn mapping_from_rows<I>(rows: I) -> AppResult<SchemeMapping>
where
    I: IntoIterator<Item = (String, String)>,
{
    SchemeMapping::from_entries(
        rows.into_iter()
            .map(|(issue_type, workflow)| (issue_type_from_column(issue_type), workflow)),
    )
}

fn group_scheme_entities(rows: Vec<SchemeEntityRow>) -> BTreeMap<i64, Vec<(String, String)>> {
    let mut grouped: BTreeMap<i64, Vec<(String, String)>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.scheme_id)
            .or_default()
            .push((row.issue_type, row.workflow));
    }
    grouped
}

fn group_draft_entities(rows: Vec<DraftEntityRow>) -> BTreeMap<i64, Vec<(String, String)>> {
    let mut grouped: BTreeMap<i64, Vec<(String, String)>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.scheme_id)
            .or_default()
            .push((row.issue_type, row.workflow));
    }
    grouped
}

fn assignable_from_row(row: WorkflowSchemeRow, entities: Vec<(String, String)>) -> AppResult<AssignableState> {
    Ok(AssignableState {
        id: Some(row.id),
        name: row.name,
        description: row.description,
        mapping: mapping_from_rows(entities)?,
    })
}

fn draft_from_row(row: DraftSchemeRow, entities: Vec<(String, String)>) -> AppResult<DraftState> {
    Ok(DraftState {
        id: Some(row.id),
        parent_id: row.parent_id,
        mapping: mapping_from_rows(entities)?,
        last_modified_user: row.last_modified_user,
        last_modified_date: row.last_modified_date,
    })
}

fn scheme_entities(scheme_id: i64, mapping: &SchemeMapping) -> Vec<NewSchemeEntityRow<'_>> {
    mapping
        .entries()
        .iter()
        .map(|(issue_type, workflow)| NewSchemeEntityRow {
            scheme_id,
            workflow,
            issue_type: issue_type_to_column(issue_type.as_deref()),
        })
        .collect()
}

fn draft_entities(draft_id: i64, mapping: &SchemeMapping) -> Vec<NewDraftEntityRow<'_>> {
    mapping
        .entries()
        .iter()
        .map(|(issue_type, workflow)| NewDraftEntityRow {
            scheme_id: draft_id,
            workflow,
            issue_type: issue_type_to_column(issue_type.as_deref()),
        })
        .collect()
}

fn load_assignables(conn: &mut PgConnection, rows: Vec<WorkflowSchemeRow>) -> AppResult<Vec<AssignableState>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut entities = group_scheme_entities(SchemesRepo::list_entities_for(conn, &ids)?);
    rows.into_iter()
        .map(|row| {
            let own = entities.remove(&row.id).unwrap_or_default();
            assignable_from_row(row, own)
        })
        .collect()
}

fn load_drafts(conn: &mut PgConnection, rows: Vec<DraftSchemeRow>) -> AppResult<Vec<DraftState>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut entities = group_draft_entities(DraftsRepo::list_entities_for(conn, &ids)?);
    rows.into_iter()
        .map(|row| {
            let own = entities.remove(&row.id).unwrap_or_default();
            draft_from_row(row, own)
        })
        .collect()
}

pub struct PgAssignableSchemeStore {
    pool: DbPool,
}

impl PgAssignableSchemeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AssignableSchemeStore for PgAssignableSchemeStore {
    fn create(&self, state: AssignableState) -> AppResult<AssignableState> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let row = SchemesRepo::insert_scheme(
                conn,
                &NewWorkflowSchemeRow {
                    name: &state.name,
                    description: state.description.as_deref(),
                },
            )?;
            SchemesRepo::replace_entities(conn, row.id, &scheme_entities(row.id, &state.mapping))?;
            debug!(scheme_id = row.id, name = %row.name, "Created workflow scheme row");
            Ok(AssignableState {
                id: Some(row.id),
                ..state
            })
        })
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<AssignableState>> {
        let mut conn = self.pool.get()?;
        let Some(row) = SchemesRepo::find_by_id(&mut conn, id)? else {
            return Ok(None);
        };
        let entities = SchemesRepo::list_entities(&mut conn, id)?
            .into_iter()
            .map(|e| (e.issue_type, e.workflow))
            .collect();
        assignable_from_row(row, entities).map(Some)
    }

    fn get_by_name(&self, name: &str) -> AppResult<Option<AssignableState>> {
        let mut conn = self.pool.get()?;
        let Some(row) = SchemesRepo::find_by_name(&mut conn, name)? else {
            return Ok(None);
        };
        let entities = SchemesRepo::list_entities(&mut conn, row.id)?
            .into_iter()
            .map(|e| (e.issue_type, e.workflow))
            .collect();
        assignable_from_row(row, entities).map(Some)
    }

    fn get_all(&self) -> AppResult<Vec<AssignableState>> {
        let mut conn = self.pool.get()?;
        let rows = SchemesRepo::list_all(&mut conn)?;
        load_assignables(&mut conn, rows)
    }

    fn update(&self, state: AssignableState) -> AppResult<AssignableState> {
        let id = state.require_id()?;
        let mut conn = self.pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let updated =
                SchemesRepo::update_fields(conn, id, &state.name, state.description.as_deref())?;
            if updated == 0 {
                return Err(AppError::not_found(format!("workflow scheme {}", id)));
            }
            SchemesRepo::replace_entities(conn, id, &scheme_entities(id, &state.mapping))?;
            Ok(state)
        })
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            SchemesRepo::delete_entities(conn, id)?;
            Ok(SchemesRepo::delete_by_id(conn, id)? > 0)
        })
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(SchemesRepo::rename_workflow(&mut conn, old, new)? > 0)
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<AssignableState>> {
        let mut conn = self.pool.get()?;
        let ids = SchemesRepo::scheme_ids_using_workflow(&mut conn, workflow)?;
        let rows = SchemesRepo::list_by_ids(&mut conn, &ids)?;
        load_assignables(&mut conn, rows)
    }
}

pub struct PgDraftSchemeStore {
    pool: DbPool,
}

impl PgDraftSchemeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl DraftSchemeStore for PgDraftSchemeStore {
    fn create(&self, state: DraftState) -> AppResult<DraftState> {
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        let result = conn.transaction::<_, AppError, _>(|conn| {
            let row = DraftsRepo::insert_draft(
                conn,
                &NewDraftSchemeRow {
                    parent_id: state.parent_id,
                    last_modified_user: state.last_modified_user.as_deref(),
                    last_modified_date: now,
                },
            )?;
            DraftsRepo::replace_entities(conn, row.id, &draft_entities(row.id, &state.mapping))?;
            Ok(row)
        });
        match result {
            Ok(row) => Ok(DraftState {
                id: Some(row.id),
                last_modified_date: row.last_modified_date,
                ..state
            }),
            Err(AppError::Database(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            ))) => Err(AppError::invalid_argument("scheme already has draft")),
            Err(e) => Err(e),
        }
    }

    fn get(&self, id: SchemeId) -> AppResult<Option<DraftState>> {
        let mut conn = self.pool.get()?;
        let Some(row) = DraftsRepo::find_by_id(&mut conn, id)? else {
            return Ok(None);
        };
        let entities = DraftsRepo::list_entities(&mut conn, id)?
            .into_iter()
            .map(|e| (e.issue_type, e.workflow))
            .collect();
        draft_from_row(row, entities).map(Some)
    }

    fn get_draft_for_parent(&self, parent_id: SchemeId) -> AppResult<Option<DraftState>> {
        let mut conn = self.pool.get()?;
        let rows = DraftsRepo::list_by_parent(&mut conn, parent_id)?;
        let drafts = load_drafts(&mut conn, rows)?;
        Ok(pick_single_draft(parent_id, drafts))
    }

    fn update(&self, state: DraftState) -> AppResult<DraftState> {
        let id = state.require_id()?;
        let mut conn = self.pool.get()?;
        let now = Utc::now();
        conn.transaction::<_, AppError, _>(|conn| {
            let existing = DraftsRepo::find_by_id(conn, id)?
                .ok_or_else(|| AppError::not_found(format!("draft workflow scheme {}", id)))?;
            if existing.parent_id != state.parent_id {
                return Err(AppError::invalid_argument("draft parent cannot be changed"));
            }
            DraftsRepo::touch(conn, id, state.last_modified_user.as_deref(), now)?;
            DraftsRepo::replace_entities(conn, id, &draft_entities(id, &state.mapping))?;
            Ok(DraftState {
                last_modified_date: now,
                ..state
            })
        })
    }

    fn delete(&self, id: SchemeId) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            DraftsRepo::delete_entities(conn, id)?;
            Ok(DraftsRepo::delete_by_id(conn, id)? > 0)
        })
    }

    fn delete_by_parent_id(&self, parent_id: SchemeId) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let mut deleted = false;
            for row in DraftsRepo::list_by_parent(conn, parent_id)? {
                DraftsRepo::delete_entities(conn, row.id)?;
                deleted |= DraftsRepo::delete_by_id(conn, row.id)? > 0;
            }
            Ok(deleted)
        })
    }

    fn rename_workflow(&self, old: &str, new: &str) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(DraftsRepo::rename_workflow(&mut conn, old, new)? > 0)
    }

    fn get_schemes_using_workflow(&self, workflow: &str) -> AppResult<Vec<DraftState>> {
        let mut conn = self.pool.get()?;
        let ids = DraftsRepo::draft_ids_using_workflow(&mut conn, workflow)?;
        let rows = DraftsRepo::list_by_ids(&mut conn, &ids)?;
        load_drafts(&mut conn, rows)
    }
}

pub struct PgProjectSchemeAssociations {
    pool: DbPool,
}

impl PgProjectSchemeAssociations {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            project_key: row.project_key,
            name: row.name,
        }
    }
}

impl ProjectSchemeAssociations for PgProjectSchemeAssociations {
    fn all_projects(&self) -> AppResult<Vec<Project>> {
        let mut conn = self.pool.get()?;
        Ok(ProjectSchemesRepo::list_projects(&mut conn)?
            .into_iter()
            .map(Project::from)
            .collect())
    }

    fn get_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        let mut conn = self.pool.get()?;
        Ok(ProjectSchemesRepo::find_project(&mut conn, project_id)?.map(Project::from))
    }

    fn scheme_for_project(&self, project_id: ProjectId) -> AppResult<Option<SchemeId>> {
        let mut conn = self.pool.get()?;
        Ok(ProjectSchemesRepo::scheme_for_project(&mut conn, project_id)?)
    }

    fn projects_using_scheme(&self, scheme_id: SchemeId) -> AppResult<Vec<Project>> {
        let mut conn = self.pool.get()?;
        Ok(ProjectSchemesRepo::projects_using_scheme(&mut conn, scheme_id)?
            .into_iter()
            .map(Project::from)
            .collect())
    }

    fn associate(&self, project_id: ProjectId, scheme_id: SchemeId) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        if ProjectSchemesRepo::find_project(&mut conn, project_id)?.is_none() {
            return Err(AppError::not_found(format!("project {}", project_id)));
        }
        ProjectSchemesRepo::upsert_association(
            &mut conn,
            &ProjectSchemeRow {
                project_id,
                scheme_id,
            },
        )?;
        Ok(())
    }

    fn dissociate(&self, project_id: ProjectId) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(ProjectSchemesRepo::delete_association(&mut conn, project_id)? > 0)
    }

    fn any_project_without_scheme(&self) -> AppResult<bool> {
        let mut conn = self.pool.get()?;
        Ok(ProjectSchemesRepo::count_projects_without_scheme(&mut conn)? > 0)
    }
}
