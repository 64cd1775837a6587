//! SeaORM entity definitions for the department hierarchy tables.

pub mod prelude;

pub mod departments;
pub mod jobs;
pub mod organization_members;
