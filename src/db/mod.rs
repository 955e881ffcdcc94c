//! SQLite persistence for fee states and the settlement log.

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
