//! Schema migrations for the partition store.
//!
//! `_migrations` records the highest applied version. Each pending
//! migration runs in its own transaction together with its version row.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// One schema step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "partitions", sql: include_str!("../../migrations/001_partitions.sql") },
    Migration {
        version: 2,
        name: "entries_seq_index",
        sql: include_str!("../../migrations/002_entries_seq_index.sql"),
    },
];

/// Highest applied version, 0 on a fresh database.
fn current_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?)
}

fn apply(conn: &mut rusqlite::Connection, migrations: &[Migration]) -> Result<i64, Error> {
    let mut version = current_version(conn)?;

    for migration in migrations.iter().filter(move |m| m.version > version) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| Error::MigrationFailed(format!("{} ({}): {e}", migration.version, migration.name)))?;
        tx.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
            params![migration.version, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        version = migration.version;
        tracing::debug!(version, name = migration.name, "applied cache migration");
    }

    Ok(version)
}

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a migration's SQL fails.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> { apply(conn, MIGRATIONS).map(|_| ()) })
        .await
        .map_err(Error::from)
}
