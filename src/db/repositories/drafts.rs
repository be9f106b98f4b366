use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::db::models::workflow_scheme::{
    DraftEntityRow, DraftSchemeRow, NewDraftEntityRow, NewDraftSchemeRow,
};

pub struct DraftsRepo;

impl DraftsRepo {
    pub fn insert_draft(
        conn: &mut PgConnection,
        new_draft: &NewDraftSchemeRow,
    ) -> Result<DraftSchemeRow, diesel::result::Error> {
        diesel::insert_into(crate::schema::draft_workflow_schemes::table)
            .values(new_draft)
            .returning(DraftSchemeRow::as_returning())
            .get_result(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        draft_id: i64,
    ) -> Result<Option<DraftSchemeRow>, diesel::result::Error> {
        use crate::schema::draft_workflow_schemes::dsl::*;
        draft_workflow_schemes
            .filter(id.eq(draft_id))
            .select(DraftSchemeRow::as_select())
            .first(conn)
            .optional()
    }

    pub fn list_by_parent(
        conn: &mut PgConnection,
        parent: i64,
    ) -> Result<Vec<DraftSchemeRow>, diesel::result::Error> {
        use crate::schema::draft_workflow_schemes::dsl::*;
        draft_workflow_schemes
            .filter(parent_id.eq(parent))
            .order(id.asc())
            .select(DraftSchemeRow::as_select())
            .load(conn)
    }

    pub fn list_by_ids(
        conn: &mut PgConnection,
        draft_ids: &[i64],
    ) -> Result<Vec<DraftSchemeRow>, diesel::result::Error> {
        use crate::schema::draft_workflow_schemes::dsl::*;
        draft_workflow_schemes
            .filter(id.eq_any(draft_ids))
            .order(id.asc())
            .select(DraftSchemeRow::as_select())
            .load(conn)
    }

    pub fn touch(
        conn: &mut PgConnection,
        draft_id: i64,
        user: Option<&str>,
        modified_at: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::draft_workflow_schemes::dsl::*;
        diesel::update(draft_workflow_schemes.filter(id.eq(draft_id)))
            .set((last_modified_user.eq(user), last_modified_date.eq(modified_at)))
            .execute(conn)
    }

    pub fn delete_by_id(conn: &mut PgConnection, draft_id: i64) -> Result<usize, diesel::result::Error> {
        use crate::schema::draft_workflow_schemes::dsl::*;
        diesel::delete(draft_workflow_schemes.filter(id.eq(draft_id))).execute(conn)
    }

    pub fn list_entities(
        conn: &mut PgConnection,
        target_draft: i64,
    ) -> Result<Vec<DraftEntityRow>, diesel::result::Error> {
        use crate::schema::draft_workflow_scheme_entities::dsl::*;
        draft_workflow_scheme_entities
            .filter(scheme_id.eq(target_draft))
            .order(id.asc())
            .select(DraftEntityRow::as_select())
            .load(conn)
    }

    pub fn list_entities_for(
        conn: &mut PgConnection,
        target_drafts: &[i64],
    ) -> Result<Vec<DraftEntityRow>, diesel::result::Error> {
        use crate::schema::draft_workflow_scheme_entities::dsl::*;
        draft_workflow_scheme_entities
            .filter(scheme_id.eq_any(target_drafts))
            .order(id.asc())
            .select(DraftEntityRow::as_select())
            .load(conn)
    }

    pub fn replace_entities(
        conn: &mut PgConnection,
        target_draft: i64,
        entities: &[NewDraftEntityRow],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::draft_workflow_scheme_entities::dsl::*;
        diesel::delete(draft_workflow_scheme_entities.filter(scheme_id.eq(target_draft)))
            .execute(conn)?;
        if entities.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(crate::schema::draft_workflow_scheme_entities::table)
            .values(entities)
            .execute(conn)
    }

    pub fn delete_entities(conn: &mut PgConnection, target_draft: i64) -> Result<usize, diesel::result::Error> {
        use crate::schema::draft_workflow_scheme_entities::dsl::*;
        diesel::delete(draft_workflow_scheme_entities.filter(scheme_id.eq(target_draft)))
            .execute(conn)
    }

    pub fn draft_ids_using_workflow(
        conn: &mut PgConnection,
        workflow_name: &str,
    ) -> Result<Vec<i64>, diesel::result::Error> {
        use crate::schema::draft_workflow_scheme_entities::dsl::*;
        draft_workflow_scheme_entities
            .filter(workflow.eq(workflow_name))
            .select(scheme_id)
            .distinct()
            .load(conn)
    }

    pub fn rename_workflow(
        conn: &mut PgConnection,
        old_name: &str,
        new_name: &str,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::draft_workflow_scheme_entities::dsl::*;
        diesel::update(draft_workflow_scheme_entities.filter(workflow.eq(old_name)))
            .set(workflow.eq(new_name))
            .execute(conn)
    }
}
