//! Data models for departments and their dependents.

pub mod department;

pub use department::{
    CreateDepartment, DeleteSummary, Department, DepartmentColor, DepartmentCounts, DepartmentDetail,
    DepartmentField, MemberSummary, UpdateDepartment,
};
