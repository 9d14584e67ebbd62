//! Schema migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Detect a fresh store explicitly and apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - The applied version is stamped into `schemaVersion` (row `id = 1`) in the
//!   same transaction as the DDL it describes.
//! - A store stamped with a newer version than this binary knows is rejected.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, OptionalExtension};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_epoch_millis.sql"),
    },
];

const SCHEMA_VERSION_TABLE: &str = "schemaVersion";

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns the version stamped in the store, or `0` for a fresh store.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    if !version_table_exists(conn)? {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM schemaVersion WHERE id = 1;", [], |row| {
            row.get::<_, u32>(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        tx.execute_batch(migration.sql)?;
    }
    tx.execute(
        "INSERT INTO schemaVersion (id, version) VALUES (1, ?1)
         ON CONFLICT (id) DO UPDATE SET version = excluded.version;",
        [latest],
    )?;
    tx.commit()?;

    info!(
        "event=schema_migrate module=db status=ok from_version={} to_version={}",
        current, latest
    );
    Ok(())
}

fn version_table_exists(conn: &Connection) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [SCHEMA_VERSION_TABLE],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
