use diesel::prelude::*;

use crate::db::models::workflow_scheme::{ProjectRow, ProjectSchemeRow};

pub struct ProjectSchemesRepo;

impl ProjectSchemesRepo {
    pub fn list_projects(conn: &mut PgConnection) -> Result<Vec<ProjectRow>, diesel::result::Error> {
        use crate::schema::projects::dsl::*;
        projects.order(id.asc()).select(ProjectRow::as_select()).load(conn)
    }

    pub fn find_project(
        conn: &mut PgConnection,
        target_project: i64,
    ) -> Result<Option<ProjectRow>, diesel::result::Error> {
        use crate::schema::projects::dsl::*;
        projects
            .filter(id.eq(target_project))
            .select(ProjectRow::as_select())
            .first(conn)
            .optional()
    }

    pub fn scheme_for_project(
        conn: &mut PgConnection,
        target_project: i64,
    ) -> Result<Option<i64>, diesel::result::Error> {
        use crate::schema::project_workflow_schemes::dsl::*;
        project_workflow_schemes
            .filter(project_id.eq(target_project))
            .select(scheme_id)
            .first(conn)
            .optional()
    }

    pub fn projects_using_scheme(
        conn: &mut PgConnection,
        target_scheme: i64,
    ) -> Result<Vec<ProjectRow>, diesel::result::Error> {
        use crate::schema::{project_workflow_schemes, projects};
        projects::table
            .inner_join(project_workflow_schemes::table)
            .filter(project_workflow_schemes::scheme_id.eq(target_scheme))
            .order(projects::id.asc())
            .select(ProjectRow::as_select())
            .load(conn)
    }

    pub fn count_projects_without_scheme(conn: &mut PgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::{project_workflow_schemes, projects};
        projects::table
            .left_join(project_workflow_schemes::table)
            .filter(project_workflow_schemes::project_id.is_null())
            .count()
            .get_result(conn)
    }

    pub fn upsert_association(
        conn: &mut PgConnection,
        association: &ProjectSchemeRow,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::project_workflow_schemes::dsl::*;
        diesel::insert_into(project_workflow_schemes)
            .values(association)
            .on_conflict(project_id)
            .do_update()
            .set(association)
            .execute(conn)
    }

    pub fn delete_association(
        conn: &mut PgConnection,
        target_project: i64,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::project_workflow_schemes::dsl::*;
        diesel::delete(project_workflow_schemes.filter(project_id.eq(target_project))).execute(conn)
    }
}
