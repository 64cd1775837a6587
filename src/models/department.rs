//! Department DTOs for create, update and read operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::entities::departments;

/// Color tag shown next to a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartmentColor {
    Slate,
    Red,
    Orange,
    Amber,
    Green,
    Teal,
    Blue,
    Indigo,
    Purple,
    Pink,
}

impl DepartmentColor {
    pub const ALL: [DepartmentColor; 10] = [
        Self::Slate,
        Self::Red,
        Self::Orange,
        Self::Amber,
        Self::Green,
        Self::Teal,
        Self::Blue,
        Self::Indigo,
        Self::Purple,
        Self::Pink,
    ];

    /// Tag stored in the `color` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slate => "slate",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Amber => "amber",
            Self::Green => "green",
            Self::Teal => "teal",
            Self::Blue => "blue",
            Self::Indigo => "indigo",
            Self::Purple => "purple",
            Self::Pink => "pink",
        }
    }
}

impl fmt::Display for DepartmentColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepartmentColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == tag)
            .ok_or_else(|| format!("unknown color `{s}`"))
    }
}

/// Mutable department fields, in the order the permission gate reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepartmentField {
    Name,
    Description,
    Color,
    HeadId,
    ParentId,
    DisplayOrder,
    IsActive,
}

impl DepartmentField {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Color => "color",
            Self::HeadId => "headId",
            Self::ParentId => "parentId",
            Self::DisplayOrder => "displayOrder",
            Self::IsActive => "isActive",
        }
    }
}

impl fmt::Display for DepartmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DTO for creating a department.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartment {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<DepartmentColor>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub head_id: Option<Uuid>,
    #[serde(default)]
    pub display_order: i32,
}

/// DTO for a partial update.
///
/// Outer `None` leaves the field untouched; for nullable columns
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateDepartment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub color: Option<Option<DepartmentColor>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub head_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Distinguishes an explicit `null` from an absent key.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateDepartment {
    /// Fields present in this request, in gate order.
    pub fn proposed_fields(&self) -> Vec<DepartmentField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(DepartmentField::Name);
        }
        if self.description.is_some() {
            fields.push(DepartmentField::Description);
        }
        if self.color.is_some() {
            fields.push(DepartmentField::Color);
        }
        if self.head_id.is_some() {
            fields.push(DepartmentField::HeadId);
        }
        if self.parent_id.is_some() {
            fields.push(DepartmentField::ParentId);
        }
        if self.display_order.is_some() {
            fields.push(DepartmentField::DisplayOrder);
        }
        if self.is_active.is_some() {
            fields.push(DepartmentField::IsActive);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.proposed_fields().is_empty()
    }
}

/// Public fields of a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: Option<DepartmentColor>,
    pub display_order: i32,
    pub is_active: bool,
    pub parent_id: Option<Uuid>,
    pub head_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<departments::Model> for Department {
    fn from(model: departments::Model) -> Self {
        // Unknown tags written outside this crate read back as no color.
        let color = model.color.as_deref().and_then(|c| c.parse().ok());
        Self {
            id: model.id,
            organization_id: model.organization_id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            color,
            display_order: model.display_order,
            is_active: model.is_active,
            parent_id: model.parent_id,
            head_id: model.head_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Minimal member profile shown on a department page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub title: Option<String>,
}

/// Aggregate dependent counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentCounts {
    pub members: u64,
    pub jobs: u64,
    pub children: u64,
}

/// Department with its active children, member preview and counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDetail {
    #[serde(flatten)]
    pub department: Department,
    pub children: Vec<Department>,
    pub members: Vec<MemberSummary>,
    pub counts: DepartmentCounts,
}

/// What a cascading delete rewrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub children_promoted: u64,
    pub members_cleared: u64,
    pub jobs_cleared: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_round_trip() {
        assert_eq!("Teal".parse::<DepartmentColor>().unwrap(), DepartmentColor::Teal);
        assert!("magenta".parse::<DepartmentColor>().is_err());
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: UpdateDepartment = serde_json::from_str(r#"{"parentId": null, "name": "Ops"}"#).unwrap();
        assert_eq!(patch.parent_id, Some(None));
        assert_eq!(patch.head_id, None);
        assert_eq!(patch.name.as_deref(), Some("Ops"));
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let result = serde_json::from_str::<UpdateDepartment>(r#"{"slug": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_proposed_fields_order() {
        let patch = UpdateDepartment {
            is_active: Some(false),
            name: Some("Ops".to_string()),
            head_id: Some(None),
            ..Default::default()
        };
        assert_eq!(
            patch.proposed_fields(),
            vec![DepartmentField::Name, DepartmentField::HeadId, DepartmentField::IsActive]
        );
        assert!(UpdateDepartment::default().is_empty());
    }
}
