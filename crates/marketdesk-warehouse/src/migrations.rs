use ::duckdb::{params, Connection};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_market_snapshots",
        sql: r#"
CREATE TABLE IF NOT EXISTS market_snapshots (
    symbol TEXT NOT NULL,
    capability TEXT NOT NULL,
    provider TEXT NOT NULL,
    payload TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    PRIMARY KEY(symbol, capability)
);
"#,
    },
    Migration {
        version: "0002_snapshot_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_market_snapshots_capability ON market_snapshots(capability);
"#,
    },
];

/// Applies every migration not yet recorded in `schema_migrations`.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params![migration.version],
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params![migration.version],
            )?;
            tracing::debug!(version = migration.version, "applied warehouse migration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let connection = Connection::open_in_memory().expect("in-memory db");

        apply_migrations(&connection).expect("first run");
        apply_migrations(&connection).expect("second run");

        let applied: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }
}
