//! Department repository. Every query is scoped to one organization.

use crate::entities::{departments, prelude::*};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

/// List departments of an organization ordered by display_order and name.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    active_only: bool,
) -> Result<Vec<departments::Model>, DbErr> {
    let mut query = Departments::find().filter(departments::Column::OrganizationId.eq(organization_id));
    if active_only {
        query = query.filter(departments::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(departments::Column::DisplayOrder)
        .order_by_asc(departments::Column::Name)
        .all(db)
        .await
}

/// Get department by ID within an organization.
///
/// A department of another organization reads as `None`.
pub async fn get_by_id<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<departments::Model>, DbErr> {
    Departments::find_by_id(id)
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .one(db)
        .await
}

/// Look up the parent link of a department.
///
/// Returns `None` if the department does not exist in the organization,
/// `Some(None)` for a root.
pub async fn parent_of<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    id: Uuid,
) -> Result<Option<Option<Uuid>>, DbErr> {
    Departments::find_by_id(id)
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .select_only()
        .column(departments::Column::ParentId)
        .into_tuple::<Option<Uuid>>()
        .one(db)
        .await
}

/// Check whether a department exists in the organization.
pub async fn exists<C: ConnectionTrait>(db: &C, organization_id: Uuid, id: Uuid) -> Result<bool, DbErr> {
    Ok(parent_of(db, organization_id, id).await?.is_some())
}

/// Check if a slug is taken in the organization (for allocation).
pub async fn slug_exists<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    slug: &str,
    exclude_id: Option<Uuid>,
) -> Result<bool, DbErr> {
    let mut query = Departments::find()
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .filter(departments::Column::Slug.eq(slug));

    if let Some(id) = exclude_id {
        query = query.filter(departments::Column::Id.ne(id));
    }

    let count = query.count(db).await?;
    Ok(count > 0)
}

/// Get child departments.
pub async fn get_children<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    parent_id: Uuid,
    active_only: bool,
) -> Result<Vec<departments::Model>, DbErr> {
    let mut query = Departments::find()
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .filter(departments::Column::ParentId.eq(parent_id));
    if active_only {
        query = query.filter(departments::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(departments::Column::DisplayOrder)
        .order_by_asc(departments::Column::Name)
        .all(db)
        .await
}

/// Count all direct children, active or not.
pub async fn count_children<C: ConnectionTrait>(db: &C, organization_id: Uuid, parent_id: Uuid) -> Result<u64, DbErr> {
    Departments::find()
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .filter(departments::Column::ParentId.eq(parent_id))
        .count(db)
        .await
}

/// Insert a new department row.
pub async fn insert<C: ConnectionTrait>(db: &C, model: departments::ActiveModel) -> Result<departments::Model, DbErr> {
    model.insert(db).await
}

/// Write changed columns of an existing department.
pub async fn update<C: ConnectionTrait>(db: &C, model: departments::ActiveModel) -> Result<departments::Model, DbErr> {
    model.update(db).await
}

/// Re-link every direct child of `id` to `new_parent`.
///
/// Returns the number of children moved.
pub async fn reparent_children<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    id: Uuid,
    new_parent: Option<Uuid>,
) -> Result<u64, DbErr> {
    let result = Departments::update_many()
        .col_expr(departments::Column::ParentId, Expr::value(new_parent))
        .col_expr(departments::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .filter(departments::Column::ParentId.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Delete a department by ID.
pub async fn delete<C: ConnectionTrait>(db: &C, organization_id: Uuid, id: Uuid) -> Result<bool, DbErr> {
    let result = Departments::delete_many()
        .filter(departments::Column::Id.eq(id))
        .filter(departments::Column::OrganizationId.eq(organization_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
