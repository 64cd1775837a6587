//! Database connection pool and utility functions.

use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Schema,
    Statement,
};
use std::time::Duration;
use tracing::log::LevelFilter;

use crate::entities::{departments, prelude::*};

/// Create a new database connection with configured pool settings.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt).await
}

/// Get database server version string.
pub async fn get_version(db: &DatabaseConnection) -> Result<String, DbErr> {
    let backend = db.get_database_backend();
    let sql = match backend {
        sea_orm::DatabaseBackend::Sqlite => "SELECT sqlite_version() AS version",
        _ => "SELECT version() AS version",
    };
    let result = db.query_one(Statement::from_string(backend, sql.to_owned())).await?;

    match result {
        Some(row) => {
            let version: String = row.try_get("", "version")?;
            Ok(version)
        }
        None => Ok("Unknown".to_owned()),
    }
}

/// Create the department, member and job tables from the entity definitions.
///
/// Used for fresh databases and tests; existing tables are left alone.
pub async fn create_schema<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    // Departments first: members and jobs reference them.
    let mut statements = [
        schema.create_table_from_entity(Departments),
        schema.create_table_from_entity(OrganizationMembers),
        schema.create_table_from_entity(Jobs),
    ];

    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }

    // A slug is unique within its organization.
    let slug_index = Index::create()
        .name("idx_departments_organization_slug")
        .table(Departments)
        .col(departments::Column::OrganizationId)
        .col(departments::Column::Slug)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&slug_index)).await?;
    Ok(())
}

/// Get record counts for all tables.
pub async fn get_table_counts(db: &DatabaseConnection) -> Result<TableCounts, DbErr> {
    let departments = Departments::find().count(db).await?;
    let members = OrganizationMembers::find().count(db).await?;
    let jobs = Jobs::find().count(db).await?;

    Ok(TableCounts {
        departments,
        members,
        jobs,
    })
}

/// Table record counts.
#[derive(Debug, Clone)]
pub struct TableCounts {
    pub departments: u64,
    pub members: u64,
    pub jobs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestDb, org};
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    fn row(organization_id: Uuid, slug: &str) -> departments::ActiveModel {
        let now = Utc::now();
        departments::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            name: Set("Engineering".to_string()),
            slug: Set(slug.to_string()),
            description: Set(None),
            color: Set(None),
            display_order: Set(0),
            is_active: Set(true),
            parent_id: Set(None),
            head_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected_by_store() {
        let t = TestDb::new().await;
        row(org(1), "engineering").insert(&t.db).await.unwrap();

        assert!(row(org(1), "engineering").insert(&t.db).await.is_err());
        assert_eq!(Departments::find().count(&t.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_slug_allowed_in_other_organization() {
        let t = TestDb::new().await;
        row(org(1), "engineering").insert(&t.db).await.unwrap();
        row(org(2), "engineering").insert(&t.db).await.unwrap();

        assert_eq!(Departments::find().count(&t.db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_schema_is_repeatable() {
        let t = TestDb::new().await;
        create_schema(&t.db).await.unwrap();
        assert_eq!(get_table_counts(&t.db).await.unwrap().departments, 0);
    }
}
