//! Shared fixtures for database-backed tests.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::auth::{AuthContext, Role};
use crate::db;
use crate::entities::{departments, jobs, organization_members, prelude::*};

/// Stable organization id for tests.
pub fn org(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Auth context for a member of `organization_id`.
pub fn actor(organization_id: Uuid, role: Role, member_id: Uuid) -> AuthContext {
    AuthContext {
        organization_id,
        role,
        member_id,
        account_id: Uuid::new_v4(),
    }
}

/// In-memory SQLite database with the schema applied.
pub struct TestDb {
    pub db: DatabaseConnection,
}

impl TestDb {
    pub async fn new() -> Self {
        // One connection: each SQLite memory connection is its own database.
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("connect sqlite");
        db::create_schema(&db).await.expect("create schema");
        Self { db }
    }

    pub async fn department(&self, organization_id: Uuid, name: &str, parent_id: Option<Uuid>) -> departments::Model {
        let slug = crate::slug::normalize(name, 64).expect("sluggable name");
        self.department_with_slug(organization_id, name, &slug, parent_id).await
    }

    pub async fn department_with_slug(
        &self,
        organization_id: Uuid,
        name: &str,
        slug: &str,
        parent_id: Option<Uuid>,
    ) -> departments::Model {
        let now = Utc::now();
        departments::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(None),
            color: Set(None),
            display_order: Set(0),
            is_active: Set(true),
            parent_id: Set(parent_id),
            head_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .expect("insert department")
    }

    pub async fn member(
        &self,
        organization_id: Uuid,
        name: &str,
        department_id: Option<Uuid>,
    ) -> organization_members::Model {
        organization_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            account_id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(format!("{}@example.com", name.to_lowercase())),
            title: Set(None),
            department_id: Set(department_id),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .expect("insert member")
    }

    pub async fn job(&self, organization_id: Uuid, title: &str, department_id: Option<Uuid>) -> jobs::Model {
        jobs::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            title: Set(title.to_string()),
            status: Set("open".to_string()),
            department_id: Set(department_id),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .expect("insert job")
    }

    /// Make `id` the head of `department_id`, bypassing the service.
    pub async fn set_head(&self, department_id: Uuid, head_id: Uuid) {
        Departments::update_many()
            .col_expr(departments::Column::HeadId, Expr::value(Some(head_id)))
            .filter(departments::Column::Id.eq(department_id))
            .exec(&self.db)
            .await
            .expect("set head");
    }

    /// Write a parent link directly, bypassing every check.
    pub async fn force_parent(&self, department_id: Uuid, parent_id: Option<Uuid>) {
        Departments::update_many()
            .col_expr(departments::Column::ParentId, Expr::value(parent_id))
            .filter(departments::Column::Id.eq(department_id))
            .exec(&self.db)
            .await
            .expect("force parent");
    }

    pub async fn find_department(&self, id: Uuid) -> Option<departments::Model> {
        Departments::find_by_id(id).one(&self.db).await.expect("find department")
    }

    pub async fn find_member(&self, id: Uuid) -> organization_members::Model {
        OrganizationMembers::find_by_id(id)
            .one(&self.db)
            .await
            .expect("find member")
            .expect("member exists")
    }

    pub async fn find_job(&self, id: Uuid) -> jobs::Model {
        Jobs::find_by_id(id).one(&self.db).await.expect("find job").expect("job exists")
    }
}
