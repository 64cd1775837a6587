//! Job posting queries used by the department engine.

use crate::entities::{jobs, prelude::*};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

/// Count job postings assigned to a department.
pub async fn count_for_department<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    department_id: Uuid,
) -> Result<u64, DbErr> {
    Jobs::find()
        .filter(jobs::Column::OrganizationId.eq(organization_id))
        .filter(jobs::Column::DepartmentId.eq(department_id))
        .count(db)
        .await
}

/// Unassign every job posting from a department.
pub async fn clear_department<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    department_id: Uuid,
) -> Result<u64, DbErr> {
    let result = Jobs::update_many()
        .col_expr(jobs::Column::DepartmentId, Expr::value(Option::<Uuid>::None))
        .filter(jobs::Column::OrganizationId.eq(organization_id))
        .filter(jobs::Column::DepartmentId.eq(department_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
