//! Database connection pool and operations.

pub mod connection;
pub mod department;
pub mod job;
pub mod member;

pub use connection::{TableCounts, connect, create_schema, get_table_counts, get_version};
