pub mod memory;
pub mod migrations;
pub mod queries;
pub mod sqlite;
pub mod store;

use std::path::Path;

use anyhow::Context;
use rusqlite::Connection;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{Store, StoreTx};

/// Migrations shipped with the crate; overridden by `MIGRATIONS_DIR` at runtime.
pub const DEFAULT_MIGRATIONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");

pub fn init_db(path: &str, migrations_dir: &Path) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("failed to open database at {path}"))?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn, migrations_dir)?;

    Ok(conn)
}
