mod filter;
mod repository;

pub use filter::*;
pub use repository::*;

/// SQL migration for the bookkeeping tables
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
