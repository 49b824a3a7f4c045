//! Persistence for work item types and work items.

pub mod cache;
pub mod schema;
pub mod sqlite;

pub use cache::TypeCache;
pub use sqlite::SqliteStorage;
