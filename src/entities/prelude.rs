pub use super::departments::Entity as Departments;
pub use super::jobs::Entity as Jobs;
pub use super::organization_members::Entity as OrganizationMembers;
