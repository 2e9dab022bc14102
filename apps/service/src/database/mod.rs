/// Database abstraction layer
///
/// Checks are read from and outcomes written to a local libsql database.
/// The scheduler only sees the `CheckStore` and `ResultStore` traits.

pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{CheckStore, DatabaseImpl, ResultStore};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
