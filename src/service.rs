//! Department mutation service.
//!
//! The only writer of the department table. Every operation is scoped to the
//! caller's organization; a department of another organization is reported
//! as not found. Each write runs in one transaction and audit entries are
//! queued only after commit.

use chrono::Utc;
use sea_orm::{ActiveValue::Set, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditLog, FieldChange};
use crate::auth::AuthContext;
use crate::authz::{self, Actor};
use crate::config::HierarchyConfig;
use crate::cycle;
use crate::db::{department, job, member};
use crate::entities::departments;
use crate::error::{AppError, Result};
use crate::models::{
    CreateDepartment, DeleteSummary, Department, DepartmentCounts, DepartmentDetail, MemberSummary,
    UpdateDepartment,
};
use crate::slug;
use crate::tree::{self, DepartmentNode};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!("name must be at most {MAX_NAME_LEN} characters")));
    }
    Ok(name.to_string())
}

fn clean_description(description: Option<String>) -> Result<Option<String>> {
    let Some(text) = description else {
        return Ok(None);
    };
    let text = text.trim();
    if text.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok((!text.is_empty()).then(|| text.to_string()))
}

fn not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("department {id}"))
}

/// Record `old -> new` when they differ.
fn track<T: serde::Serialize + PartialEq>(changes: &mut Vec<FieldChange>, field: &str, old: &T, new: &T) -> bool {
    if old == new {
        return false;
    }
    changes.push(FieldChange {
        field: field.to_string(),
        old: json!(old),
        new: json!(new),
    });
    true
}

/// Validated form of an update request.
struct UpdatePlan {
    name: Option<String>,
    description: Option<Option<String>>,
    color: Option<Option<String>>,
    head_id: Option<Option<Uuid>>,
    parent_id: Option<Option<Uuid>>,
    display_order: Option<i32>,
    is_active: Option<bool>,
}

impl UpdatePlan {
    fn from_patch(patch: UpdateDepartment) -> Result<Self> {
        Ok(Self {
            name: patch.name.as_deref().map(clean_name).transpose()?,
            description: patch.description.map(clean_description).transpose()?,
            color: patch.color.map(|c| c.map(|c| c.as_str().to_string())),
            head_id: patch.head_id,
            parent_id: patch.parent_id,
            display_order: patch.display_order,
            is_active: patch.is_active,
        })
    }
}

/// Department operations for one store.
#[derive(Debug, Clone)]
pub struct DepartmentService {
    db: DatabaseConnection,
    settings: HierarchyConfig,
    audit: AuditLog,
}

impl DepartmentService {
    /// Create a new department service.
    pub fn new(db: DatabaseConnection, settings: HierarchyConfig, audit: AuditLog) -> Self {
        Self { db, settings, audit }
    }

    /// Department with active children, a member preview and counts.
    pub async fn get(&self, ctx: &AuthContext, id: Uuid) -> Result<DepartmentDetail> {
        let org = ctx.organization_id;
        let dept = department::get_by_id(&self.db, org, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let children = department::get_children(&self.db, org, id, true).await?;
        let members = member::list_for_department(&self.db, org, id, self.settings.member_preview_limit).await?;
        let counts = DepartmentCounts {
            members: member::count_for_department(&self.db, org, id).await?,
            jobs: job::count_for_department(&self.db, org, id).await?,
            children: department::count_children(&self.db, org, id).await?,
        };
        debug!("Loaded department {id} with {} members", counts.members);

        Ok(DepartmentDetail {
            department: dept.into(),
            children: children.into_iter().map(Department::from).collect(),
            members: members
                .into_iter()
                .map(|m| MemberSummary {
                    id: m.id,
                    name: m.name,
                    email: m.email,
                    title: m.title,
                })
                .collect(),
            counts,
        })
    }

    /// All departments of the caller's organization.
    pub async fn list(&self, ctx: &AuthContext, active_only: bool) -> Result<Vec<Department>> {
        let rows = department::list(&self.db, ctx.organization_id, active_only).await?;
        Ok(rows.into_iter().map(Department::from).collect())
    }

    /// The caller's organization as nested trees.
    pub async fn forest(&self, ctx: &AuthContext) -> Result<Vec<DepartmentNode>> {
        Ok(tree::build_forest(self.list(ctx, false).await?))
    }

    /// Create a department. Admin only.
    pub async fn create(&self, ctx: &AuthContext, mut data: CreateDepartment) -> Result<Department> {
        if !ctx.is_admin() {
            return Err(AppError::forbidden("only an admin may create departments"));
        }
        let name = clean_name(&data.name)?;
        let description = clean_description(data.description.take())?;
        let org = ctx.organization_id;

        let txn = self.db.begin().await.map_err(AppError::transaction)?;
        let created = self
            .insert_department(&txn, org, name, description, data)
            .await
            .map_err(AppError::in_transaction)?;
        txn.commit().await.map_err(AppError::transaction)?;

        info!("Created department {} ({}) in organization {org}", created.id, created.slug);
        self.audit.emit(
            AuditEntry::department("department.create", created.id, ctx.account_id).with_metadata(json!({
                "name": created.name,
                "slug": created.slug,
                "parentId": created.parent_id,
                "organizationId": org,
            })),
        );
        Ok(created.into())
    }

    /// Apply a partial update.
    ///
    /// The whole request is refused if any field is not permitted for the
    /// caller; nothing is written in that case.
    pub async fn update(&self, ctx: &AuthContext, id: Uuid, patch: UpdateDepartment) -> Result<Department> {
        let org = ctx.organization_id;
        let current = department::get_by_id(&self.db, org, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let actor = Actor::for_department(ctx, &current);
        authz::authorize(actor, &patch.proposed_fields())?;
        if patch.is_empty() {
            return Ok(current.into());
        }
        let plan = UpdatePlan::from_patch(patch)?;

        // Fast rejection before opening the transaction; repeated inside it.
        if let Some(Some(parent_id)) = plan.parent_id {
            if current.parent_id != Some(parent_id) {
                self.check_parent(&self.db, org, id, parent_id).await?;
            }
        }

        let txn = self.db.begin().await.map_err(AppError::transaction)?;
        let (updated, changes) = self
            .apply_update(&txn, org, id, plan)
            .await
            .map_err(AppError::in_transaction)?;
        txn.commit().await.map_err(AppError::transaction)?;

        if changes.is_empty() {
            debug!("Update of department {id} changed nothing");
            return Ok(updated.into());
        }

        info!(
            "Updated department {id} in organization {org}: {}",
            changes.iter().map(|c| c.field.as_str()).collect::<Vec<_>>().join(", ")
        );
        self.audit
            .emit(AuditEntry::department("department.update", id, ctx.account_id).with_changes(changes));
        Ok(updated.into())
    }

    async fn apply_update(
        &self,
        txn: &DatabaseTransaction,
        org: Uuid,
        id: Uuid,
        plan: UpdatePlan,
    ) -> Result<(departments::Model, Vec<FieldChange>)> {
        let current = department::get_by_id(txn, org, id).await?.ok_or_else(|| not_found(id))?;
        let mut active: departments::ActiveModel = current.clone().into();
        let mut changes = Vec::new();

        if let Some(name) = plan.name {
            if track(&mut changes, "name", &current.name, &name) {
                let slug = slug::allocate(txn, org, &name, Some(id), self.settings.slug_max_len).await?;
                if track(&mut changes, "slug", &current.slug, &slug) {
                    active.slug = Set(slug);
                }
                active.name = Set(name);
            }
        }
        if let Some(description) = plan.description {
            if track(&mut changes, "description", &current.description, &description) {
                active.description = Set(description);
            }
        }
        if let Some(color) = plan.color {
            if track(&mut changes, "color", &current.color, &color) {
                active.color = Set(color);
            }
        }
        if let Some(head_id) = plan.head_id {
            if let Some(member_id) = head_id {
                if head_id != current.head_id && !member::exists(txn, org, member_id).await? {
                    return Err(AppError::validation("head must be a member of this organization"));
                }
            }
            if track(&mut changes, "headId", &current.head_id, &head_id) {
                active.head_id = Set(head_id);
            }
        }
        if let Some(parent_id) = plan.parent_id {
            if parent_id != current.parent_id {
                if let Some(parent) = parent_id {
                    self.check_parent(txn, org, id, parent).await?;
                }
            }
            if track(&mut changes, "parentId", &current.parent_id, &parent_id) {
                active.parent_id = Set(parent_id);
            }
        }
        if let Some(order) = plan.display_order {
            if track(&mut changes, "displayOrder", &current.display_order, &order) {
                active.display_order = Set(order);
            }
        }
        if let Some(is_active) = plan.is_active {
            if track(&mut changes, "isActive", &current.is_active, &is_active) {
                active.is_active = Set(is_active);
            }
        }

        if changes.is_empty() {
            return Ok((current, changes));
        }
        active.updated_at = Set(Utc::now());
        let updated = department::update(txn, active).await?;
        Ok((updated, changes))
    }

    async fn insert_department(
        &self,
        txn: &DatabaseTransaction,
        org: Uuid,
        name: String,
        description: Option<String>,
        data: CreateDepartment,
    ) -> Result<departments::Model> {
        if let Some(parent_id) = data.parent_id {
            if !department::exists(txn, org, parent_id).await? {
                return Err(AppError::validation("parent department not found"));
            }
        }
        if let Some(head_id) = data.head_id {
            if !member::exists(txn, org, head_id).await? {
                return Err(AppError::validation("head must be a member of this organization"));
            }
        }
        let slug = slug::allocate(txn, org, &name, None, self.settings.slug_max_len).await?;
        let now = Utc::now();
        let model = departments::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(org),
            name: Set(name),
            slug: Set(slug),
            description: Set(description),
            color: Set(data.color.map(|c| c.as_str().to_string())),
            display_order: Set(data.display_order),
            is_active: Set(true),
            parent_id: Set(data.parent_id),
            head_id: Set(data.head_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(department::insert(txn, model).await?)
    }

    /// Promote children, unassign members and jobs, then drop the row.
    async fn cascade_delete(
        txn: &DatabaseTransaction,
        org: Uuid,
        id: Uuid,
    ) -> Result<(departments::Model, DeleteSummary)> {
        let node = department::get_by_id(txn, org, id).await?.ok_or_else(|| not_found(id))?;
        let summary = DeleteSummary {
            children_promoted: department::reparent_children(txn, org, id, node.parent_id).await?,
            members_cleared: member::clear_department(txn, org, id).await?,
            jobs_cleared: job::clear_department(txn, org, id).await?,
        };
        if !department::delete(txn, org, id).await? {
            return Err(not_found(id));
        }
        Ok((node, summary))
    }

    /// Parent must exist in the organization and must not close a loop.
    async fn check_parent<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        org: Uuid,
        id: Uuid,
        parent_id: Uuid,
    ) -> Result<()> {
        if !department::exists(db, org, parent_id).await? {
            return Err(AppError::validation("parent department not found"));
        }
        if cycle::would_create_cycle(db, id, parent_id, org, self.settings.max_depth).await? {
            return Err(AppError::validation("would create a cycle"));
        }
        Ok(())
    }

    /// Remove a department, promoting its children to its parent and
    /// unassigning its members and jobs. Admin only; all or nothing.
    pub async fn delete(&self, ctx: &AuthContext, id: Uuid) -> Result<DeleteSummary> {
        let org = ctx.organization_id;
        department::get_by_id(&self.db, org, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        if !ctx.is_admin() {
            return Err(AppError::forbidden("only an admin may delete a department"));
        }

        let txn = self.db.begin().await.map_err(AppError::transaction)?;
        let (removed, summary) = Self::cascade_delete(&txn, org, id)
            .await
            .map_err(AppError::in_transaction)?;
        txn.commit().await.map_err(AppError::transaction)?;

        info!(
            "Deleted department {id} in organization {org}: {} children promoted, {} members and {} jobs unassigned",
            summary.children_promoted, summary.members_cleared, summary.jobs_cleared
        );
        self.audit.emit(
            AuditEntry::department("department.delete", id, ctx.account_id).with_metadata(json!({
                "name": removed.name,
                "organizationId": org,
                "childrenPromoted": summary.children_promoted,
                "membersCleared": summary.members_cleared,
                "jobsCleared": summary.jobs_cleared,
            })),
        );
        Ok(summary)
    }
}
