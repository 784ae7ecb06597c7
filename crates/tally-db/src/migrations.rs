//! # Database Migrations
//!
//! Embedded SQL migrations for the reconciliation core.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Database::new / tally-doctor                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Check _sqlx_migrations table (created on first run)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Compare embedded migrations vs applied                                │
//! │       │                                                                 │
//! │       ├── 001_ledger_schema.sql  ✓ (already applied)                  │
//! │       └── 00N_next.sql           ⬜ (pending)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Run pending migrations in order, record each in _sqlx_migrations      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

/// Migrations embedded at compile time from `migrations/sqlite`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent. Each migration runs in its own transaction, in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(
        embedded = MIGRATOR.migrations.len(),
        "Checking for pending migrations"
    );

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Applied vs embedded migrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    /// Descriptions of embedded migrations not yet applied.
    pub pending: Vec<String>,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Reports which embedded migrations have been applied.
///
/// A database that was never migrated reports everything as pending.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let (table_exists,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied_versions: Vec<i64> = if table_exists > 0 {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?
    } else {
        warn!("Migration table missing; database has never been migrated");
        Vec::new()
    };

    let pending = MIGRATOR
        .migrations
        .iter()
        .filter(|m| !applied_versions.contains(&m.version))
        .map(|m| format!("{:03}_{}", m.version, m.description))
        .collect();

    Ok(MigrationStatus {
        total: MIGRATOR.migrations.len(),
        applied: applied_versions.len(),
        pending,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_status_before_and_after_migrating() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let before = migration_status(db.pool()).await.unwrap();
        assert_eq!(before.applied, 0);
        assert!(!before.is_current());
        assert_eq!(before.pending.len(), before.total);

        db.run_migrations().await.unwrap();
        // Second run is a no-op
        db.run_migrations().await.unwrap();

        let after = migration_status(db.pool()).await.unwrap();
        assert!(after.is_current());
        assert_eq!(after.applied, after.total);
    }
}
