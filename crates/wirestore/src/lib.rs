//! SQLite persistence for workflows, executions, step results and
//! credentials.

mod sqlite;

pub use sqlite::SqliteStore;
