//! Nested view of an organization's department forest.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::models::Department;

/// A department with its sub-departments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentNode {
    #[serde(flatten)]
    pub department: Department,
    pub children: Vec<DepartmentNode>,
}

fn sibling_order(a: &Department, b: &Department) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

/// Build the forest from a flat list of one organization's departments.
///
/// A department whose parent is not in the list becomes a root. Departments
/// caught in a parent loop are hung under the first loop member reached.
pub fn build_forest(departments: Vec<Department>) -> Vec<DepartmentNode> {
    let ids: HashSet<Uuid> = departments.iter().map(|d| d.id).collect();

    let mut groups: BTreeMap<Option<Uuid>, Vec<Department>> = BTreeMap::new();
    for dept in departments {
        let parent = dept.parent_id.filter(|p| ids.contains(p) && *p != dept.id);
        groups.entry(parent).or_default().push(dept);
    }
    for siblings in groups.values_mut() {
        siblings.sort_by(sibling_order);
    }

    let mut forest = Vec::new();
    // `None` sorts first, so real roots come before loop remnants.
    while let Some((_, group)) = groups.pop_first() {
        for dept in group {
            forest.push(attach(dept, &mut groups));
        }
    }
    forest
}

fn attach(department: Department, groups: &mut BTreeMap<Option<Uuid>, Vec<Department>>) -> DepartmentNode {
    let children = groups
        .remove(&Some(department.id))
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach(child, groups))
        .collect();
    DepartmentNode { department, children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dept(id: u128, name: &str, parent: Option<u128>, order: i32) -> Department {
        Department {
            id: Uuid::from_u128(id),
            organization_id: Uuid::from_u128(1),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            color: None,
            display_order: order,
            is_active: true,
            parent_id: parent.map(Uuid::from_u128),
            head_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn names(nodes: &[DepartmentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.department.name.as_str()).collect()
    }

    #[test]
    fn test_nesting_and_sibling_order() {
        let forest = build_forest(vec![
            dept(3, "Platform", Some(1), 1),
            dept(1, "Engineering", None, 0),
            dept(2, "Backend", Some(1), 1),
            dept(4, "Sales", None, 0),
            dept(5, "Infra", Some(1), 0),
        ]);

        assert_eq!(names(&forest), vec!["Engineering", "Sales"]);
        assert_eq!(names(&forest[0].children), vec!["Infra", "Backend", "Platform"]);
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn test_missing_parent_becomes_root() {
        let forest = build_forest(vec![dept(2, "Orphan", Some(99), 0), dept(1, "Root", None, 0)]);
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn test_loop_members_are_not_lost() {
        let forest = build_forest(vec![
            dept(1, "Root", None, 0),
            dept(5, "X", Some(6), 0),
            dept(6, "Y", Some(5), 0),
        ]);

        let total: usize = forest.iter().map(|n| 1 + n.children.len()).sum();
        assert_eq!(total, 3);
        assert_eq!(forest[0].department.name, "Root");
    }
}
