//! # Database Migrations
//!
//! The schema under `migrations/sqlite/` is compiled into the binary and
//! applied by [`Database::new`](crate::Database::new) when
//! `DbConfig::run_migrations` is set (the default).
//!
//! | File                     | Creates                          |
//! |--------------------------|----------------------------------|
//! | `001_initial_schema.sql` | `items`, `history`, `users`      |
//!
//! New schema changes go in a new `NNN_description.sql` file. Applied files
//! are checksummed by sqlx, so editing one breaks every existing database.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far a database is behind the embedded schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Migrations compiled into this binary
    pub embedded: usize,
    /// Migrations recorded in `_sqlx_migrations`
    pub applied: usize,
}

impl MigrationStatus {
    /// True when nothing is left to apply.
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Applies every pending migration. Already-applied ones are skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    if before.is_current() {
        info!(applied = before.applied, "Schema is up to date");
        return Ok(());
    }

    info!(
        pending = before.embedded - before.applied,
        "Applying pending migrations"
    );
    MIGRATOR.run(pool).await?;

    info!(embedded = before.embedded, "Migrations applied");
    Ok(())
}

/// Compares the embedded migrations with what the database has recorded.
///
/// A database that has never been migrated has no bookkeeping table yet
/// and reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let embedded = MIGRATOR.migrations.len();

    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    } else {
        0
    };

    let status = MigrationStatus {
        embedded,
        applied: applied.max(0) as usize,
    };
    if status.applied > status.embedded {
        warn!(
            embedded = status.embedded,
            applied = status.applied,
            "Database has migrations this binary doesn't know about"
        );
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_is_fully_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let status = db.migration_status().await.unwrap();

        assert!(status.embedded > 0);
        assert_eq!(status.embedded, status.applied);
        assert!(status.is_current());
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_pending() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let status = db.migration_status().await.unwrap();
        assert_eq!(status.applied, 0);
        assert!(!status.is_current());

        db.run_migrations().await.unwrap();
        assert!(db.migration_status().await.unwrap().is_current());

        // Second run is a no-op
        db.run_migrations().await.unwrap();
    }
}
