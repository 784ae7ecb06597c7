//! # tally-doctor
//!
//! Operator check for a ledger database.
//!
//! ```text
//! TALLY_DATABASE_PATH=/var/lib/tally/tally.db tally-doctor
//!
//!   1. load LedgerConfig from the environment
//!   2. open the pool (migrations applied on connect)
//!   3. report migration status and open shifts
//! ```
//!
//! Exits non-zero if the database is unreachable or a migration is pending.

use tally_db::migrations::migration_status;
use tally_db::repository::shift;
use tally_db::{Database, LedgerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LedgerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_target(true)
        .init();

    info!(path = %config.database_path.display(), "Checking ledger database");

    let db = Database::new(config.db_config()).await?;
    if !db.health_check().await {
        error!("Database did not answer SELECT 1");
        return Err("database unreachable".into());
    }

    let status = migration_status(db.pool()).await?;
    println!("migrations: {}/{} applied", status.applied, status.total);
    for pending in &status.pending {
        println!("  pending: {pending}");
    }

    let mut conn = db.pool().acquire().await?;
    let open = shift::count_open(&mut *conn).await?;
    println!("open shifts: {open}");
    println!("payable term: {} days", config.payable_term_days);

    db.close().await;

    if !status.is_current() {
        return Err(format!("{} migration(s) pending", status.pending.len()).into());
    }
    Ok(())
}
