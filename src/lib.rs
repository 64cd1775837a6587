pub mod audit;
pub mod auth;
pub mod authz;
pub mod config;
pub mod cycle;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod service;
pub mod slug;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AppError, ErrorKind, Result};
pub use service::DepartmentService;
