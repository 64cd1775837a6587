//! Field-level permission gate for department changes.
//!
//! Admins may change every field. A department's head may only change the
//! fields in [`HEAD_EDITABLE`]. Anyone else may change nothing.

use crate::auth::AuthContext;
use crate::entities::departments;
use crate::error::AppError;
use crate::models::DepartmentField;

/// Fields a department head may edit on their own department.
pub const HEAD_EDITABLE: &[DepartmentField] =
    &[DepartmentField::Name, DepartmentField::Description, DepartmentField::Color];

/// Caller's standing relative to one department.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Head,
    Other,
}

impl Actor {
    /// Classify the caller for `department`.
    pub fn for_department(context: &AuthContext, department: &departments::Model) -> Self {
        if context.is_admin() {
            Self::Admin
        } else if department.head_id == Some(context.member_id) {
            Self::Head
        } else {
            Self::Other
        }
    }

    pub fn may_change(self, field: DepartmentField) -> bool {
        match self {
            Self::Admin => true,
            Self::Head => HEAD_EDITABLE.contains(&field),
            Self::Other => false,
        }
    }
}

/// Why a change set was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Actor has no edit rights on the department at all.
    NotPermitted,
    /// First field the actor may not change.
    Field(DepartmentField),
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NotPermitted => AppError::forbidden("only an admin or the department head may edit this department"),
            Denial::Field(field) => {
                AppError::forbidden(format!("field `{field}` may not be changed by a department head"))
            }
        }
    }
}

/// Accept or reject a proposed change set as a whole.
pub fn authorize(actor: Actor, fields: &[DepartmentField]) -> Result<(), Denial> {
    if actor == Actor::Other {
        return Err(Denial::NotPermitted);
    }
    match fields.iter().find(|field| !actor.may_change(**field)) {
        Some(field) => Err(Denial::Field(*field)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn department(head_id: Option<Uuid>) -> departments::Model {
        departments::Model {
            id: Uuid::from_u128(10),
            organization_id: Uuid::from_u128(1),
            name: "Engineering".to_string(),
            slug: "engineering".to_string(),
            description: None,
            color: None,
            display_order: 0,
            is_active: true,
            parent_id: None,
            head_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn context(role: Role, member: u128) -> AuthContext {
        AuthContext {
            organization_id: Uuid::from_u128(1),
            role,
            member_id: Uuid::from_u128(member),
            account_id: Uuid::from_u128(member + 1000),
        }
    }

    #[test]
    fn test_actor_classification() {
        let dept = department(Some(Uuid::from_u128(7)));
        assert_eq!(Actor::for_department(&context(Role::Admin, 1), &dept), Actor::Admin);
        assert_eq!(Actor::for_department(&context(Role::Owner, 7), &dept), Actor::Admin);
        assert_eq!(Actor::for_department(&context(Role::Member, 7), &dept), Actor::Head);
        assert_eq!(Actor::for_department(&context(Role::Member, 8), &dept), Actor::Other);
        assert_eq!(Actor::for_department(&context(Role::Member, 7), &department(None)), Actor::Other);
    }

    #[test]
    fn test_admin_may_change_everything() {
        let all = [
            DepartmentField::Name,
            DepartmentField::Description,
            DepartmentField::Color,
            DepartmentField::HeadId,
            DepartmentField::ParentId,
            DepartmentField::DisplayOrder,
            DepartmentField::IsActive,
        ];
        assert_eq!(authorize(Actor::Admin, &all), Ok(()));
    }

    #[test]
    fn test_head_limited_fields() {
        assert_eq!(authorize(Actor::Head, HEAD_EDITABLE), Ok(()));
        assert_eq!(
            authorize(Actor::Head, &[DepartmentField::Name, DepartmentField::HeadId]),
            Err(Denial::Field(DepartmentField::HeadId))
        );
        assert_eq!(
            authorize(
                Actor::Head,
                &[DepartmentField::ParentId, DepartmentField::IsActive]
            ),
            Err(Denial::Field(DepartmentField::ParentId))
        );
    }

    #[test]
    fn test_other_rejected_outright() {
        assert_eq!(authorize(Actor::Other, &[]), Err(Denial::NotPermitted));
        assert_eq!(authorize(Actor::Other, &[DepartmentField::Name]), Err(Denial::NotPermitted));
    }

    #[test]
    fn test_denial_names_field() {
        let err: AppError = Denial::Field(DepartmentField::DisplayOrder).into();
        assert!(err.to_string().contains("displayOrder"));
    }
}
