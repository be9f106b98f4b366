use diesel::prelude::*;

use crate::db::models::workflow_scheme::{
    NewSchemeEntityRow, NewWorkflowSchemeRow, SchemeEntityRow, WorkflowSchemeRow,
};

pub struct SchemesRepo;

impl SchemesRepo {
    pub fn insert_scheme(
        conn: &mut PgConnection,
        new_scheme: &NewWorkflowSchemeRow,
    ) -> Result<WorkflowSchemeRow, diesel::result::Error> {
        diesel::insert_into(crate::schema::workflow_schemes::table)
            .values(new_scheme)
            .returning(WorkflowSchemeRow::as_returning())
            .get_result(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        scheme_id: i64,
    ) -> Result<Option<WorkflowSchemeRow>, diesel::result::Error> {
        use crate::schema::workflow_schemes::dsl::*;
        workflow_schemes
            .filter(id.eq(scheme_id))
            .select(WorkflowSchemeRow::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_name(
        conn: &mut PgConnection,
        scheme_name: &str,
    ) -> Result<Option<WorkflowSchemeRow>, diesel::result::Error> {
        use crate::schema::workflow_schemes::dsl::*;
        workflow_schemes
            .filter(name.eq(scheme_name))
            .order(id.asc())
            .select(WorkflowSchemeRow::as_select())
            .first(conn)
            .optional()
    }

    pub fn list_all(conn: &mut PgConnection) -> Result<Vec<WorkflowSchemeRow>, diesel::result::Error> {
        use crate::schema::workflow_schemes::dsl::*;
        workflow_schemes
            .order(id.asc())
            .select(WorkflowSchemeRow::as_select())
            .load(conn)
    }

    pub fn list_by_ids(
        conn: &mut PgConnection,
        scheme_ids: &[i64],
    ) -> Result<Vec<WorkflowSchemeRow>, diesel::result::Error> {
        use crate::schema::workflow_schemes::dsl::*;
        workflow_schemes
            .filter(id.eq_any(scheme_ids))
            .order(id.asc())
            .select(WorkflowSchemeRow::as_select())
            .load(conn)
    }

    pub fn update_fields(
        conn: &mut PgConnection,
        scheme_id: i64,
        new_name: &str,
        new_description: Option<&str>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::workflow_schemes::dsl::*;
        diesel::update(workflow_schemes.filter(id.eq(scheme_id)))
            .set((name.eq(new_name), description.eq(new_description)))
            .execute(conn)
    }

    pub fn delete_by_id(conn: &mut PgConnection, scheme_id: i64) -> Result<usize, diesel::result::Error> {
        use crate::schema::workflow_schemes::dsl::*;
        diesel::delete(workflow_schemes.filter(id.eq(scheme_id))).execute(conn)
    }

    pub fn list_entities(
        conn: &mut PgConnection,
        target_scheme: i64,
    ) -> Result<Vec<SchemeEntityRow>, diesel::result::Error> {
        use crate::schema::workflow_scheme_entities::dsl::*;
        workflow_scheme_entities
            .filter(scheme_id.eq(target_scheme))
            .order(id.asc())
            .select(SchemeEntityRow::as_select())
            .load(conn)
    }

    pub fn list_entities_for(
        conn: &mut PgConnection,
        target_schemes: &[i64],
    ) -> Result<Vec<SchemeEntityRow>, diesel::result::Error> {
        use crate::schema::workflow_scheme_entities::dsl::*;
        workflow_scheme_entities
            .filter(scheme_id.eq_any(target_schemes))
            .order(id.asc())
            .select(SchemeEntityRow::as_select())
            .load(conn)
    }

    pub fn replace_entities(
        conn: &mut PgConnection,
        target_scheme: i64,
        entities: &[NewSchemeEntityRow],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::workflow_scheme_entities::dsl::*;
        diesel::delete(workflow_scheme_entities.filter(scheme_id.eq(target_scheme))).execute(conn)?;
        if entities.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(crate::schema::workflow_scheme_entities::table)
            .values(entities)
            .execute(conn)
    }

    pub fn delete_entities(conn: &mut PgConnection, target_scheme: i64) -> Result<usize, diesel::result::Error> {
        use crate::schema::workflow_scheme_entities::dsl::*;
        diesel::delete(workflow_scheme_entities.filter(scheme_id.eq(target_scheme))).execute(conn)
    }

    pub fn scheme_ids_using_workflow(
        conn: &mut PgConnection,
        workflow_name: &str,
    ) -> Result<Vec<i64>, diesel::result::Error> {
        use crate::schema::workflow_scheme_entities::dsl::*;
        workflow_scheme_entities
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
        use crate::schema::workflow_scheme_entities::dsl::*;
        diesel::update(workflow_scheme_entities.filter(workflow.eq(old_name)))
            .set(workflow.eq(new_name))
            .execute(conn)
    }
}
