//! Organization member queries used by the department engine.

use crate::entities::{organization_members, prelude::*};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

/// Check that a member belongs to the organization.
pub async fn exists<C: ConnectionTrait>(db: &C, organization_id: Uuid, member_id: Uuid) -> Result<bool, DbErr> {
    let count = OrganizationMembers::find_by_id(member_id)
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// List members assigned to a department, ordered by name.
pub async fn list_for_department<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    department_id: Uuid,
    limit: u64,
) -> Result<Vec<organization_members::Model>, DbErr> {
    OrganizationMembers::find()
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .filter(organization_members::Column::DepartmentId.eq(department_id))
        .order_by_asc(organization_members::Column::Name)
        .limit(limit)
        .all(db)
        .await
}

/// Count members assigned to a department.
pub async fn count_for_department<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    department_id: Uuid,
) -> Result<u64, DbErr> {
    OrganizationMembers::find()
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .filter(organization_members::Column::DepartmentId.eq(department_id))
        .count(db)
        .await
}

/// Unassign every member from a department.
pub async fn clear_department<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    department_id: Uuid,
) -> Result<u64, DbErr> {
    let result = OrganizationMembers::update_many()
        .col_expr(organization_members::Column::DepartmentId, Expr::value(Option::<Uuid>::None))
        .filter(organization_members::Column::OrganizationId.eq(organization_id))
        .filter(organization_members::Column::DepartmentId.eq(department_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
