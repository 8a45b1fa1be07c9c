//! Incremental schema migrations.
//!
//! The base DDL in [`super::schema`] creates current tables; migrations add
//! what older databases lack. The `schema_migrations` table tracks which
//! have been applied.

use rusqlite::{Connection, Result};
use tracing::info;

/// A single migration with version identifier and SQL content.
struct Migration {
    version: &'static str,
    sql: &'static str,
}

/// All migrations in order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001_task_activity_index",
        sql: "CREATE INDEX IF NOT EXISTS idx_tasks_updated ON tasks(updated_at);",
    },
    Migration {
        version: "002_event_lookup_index",
        sql: "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id, created_at DESC);",
    },
];

/// Run all pending migrations on the database.
///
/// Already-applied migrations are skipped, so this is safe to call on every
/// open.
///
/// # Errors
///
/// Returns an error if a migration fails to apply; that migration is not
/// recorded, so the next open retries it.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: std::collections::HashSet<String> = conn
        .prepare("SELECT version FROM schema_migrations")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for migration in MIGRATIONS {
        if applied.contains(migration.version) {
            continue;
        }

        info!(version = migration.version, "Applying migration");

        conn.execute_batch(migration.sql)?;

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::SCHEMA_SQL;

    fn count_applied(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version LIKE '0%'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();

        run_migrations(&conn).expect("First run should succeed");
        run_migrations(&conn).expect("Second run should succeed");

        assert_eq!(count_applied(&conn), i64::try_from(MIGRATIONS.len()).unwrap());
    }

    #[test]
    fn test_failed_migration_is_not_recorded() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(run_migrations(&conn).is_err());
        assert_eq!(count_applied(&conn), 0);
    }
}
