//! # Reconciliation Coordinator
//!
//! [`Ledger`] runs every money-moving operation as one SQLite transaction.
//!
//! ## Ordering Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pay_receivable / pay_payable                                          │
//! │                                                                         │
//! │   1. validate request (no I/O)                                         │
//! │   2. BEGIN; first statement is a write → SQLite write lock held        │
//! │   3. read instrument, apply_payment (tally-core)                       │
//! │   4. UPDATE balance WHERE balance = old      ── ledger / instrument    │
//! │   5. INSERT payment_transactions                                        │
//! │   6. UPDATE shifts SET bucket = bucket + amt ── shift (if any)         │
//! │   7. UPDATE purchase_orders.payment_status   ── linked document        │
//! │   8. COMMIT                                                             │
//! │                                                                         │
//! │   Any `?` between 2 and 8 drops the transaction → full rollback.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//! - [`shifts`](self::shifts): open, close, current, list, sale accrual
//! - [`payments`](self::payments): instruments, payments, aging reads
//! - [`receiving`](self::receiving): purchase staging and receipt

mod error;
mod payments;
mod receiving;
mod shifts;

pub use error::{ErrorCode, ErrorResponse, LedgerError, LedgerResult};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool};
use tally_core::{
    DebtInstrument, PaymentTransaction, PurchaseOrder, StockMovement, DEFAULT_PAYABLE_TERM_DAYS,
};

/// The reconciliation coordinator.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    payable_term_days: i64,
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Ledger {
            pool,
            payable_term_days: DEFAULT_PAYABLE_TERM_DAYS,
        }
    }

    /// Days until a payable without an explicit due date falls due.
    pub fn payable_term_days(mut self, days: i64) -> Self {
        self.payable_term_days = days;
        self
    }

    async fn conn(&self) -> LedgerResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }
}

/// A committed payment and the instrument as it stands after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    pub payment: PaymentTransaction,
    pub instrument: DebtInstrument,
}

/// Options for [`Ledger::receive_purchase`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub create_payable: bool,
    /// Payable due date. Defaults to now + the configured term.
    pub due_date: Option<DateTime<Utc>>,
}

impl ReceiveOptions {
    pub fn with_payable() -> Self {
        ReceiveOptions {
            create_payable: true,
            due_date: None,
        }
    }

    pub fn due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Result of receiving a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptOutcome {
    pub purchase_order: PurchaseOrder,
    pub payable: Option<DebtInstrument>,
    pub movements: Vec<StockMovement>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::StoreContext;

    pub async fn ledger() -> (Database, Ledger) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger();
        (db, ledger)
    }

    pub fn ctx() -> StoreContext {
        StoreContext::new("store-1", "cashier-7")
    }

    /// A WAL file database with a real multi-connection pool, so writers
    /// actually contend for SQLite's lock.
    pub struct FileDb {
        pub db: Database,
        pub path: std::path::PathBuf,
    }

    impl FileDb {
        pub async fn new(name: &str) -> Self {
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let path = std::env::temp_dir().join(format!(
                "tally-{name}-{}-{nanos}.db",
                std::process::id()
            ));
            let db = Database::new(DbConfig::new(&path).max_connections(4))
                .await
                .unwrap();
            FileDb { db, path }
        }

        pub async fn cleanup(self) {
            self.db.close().await;
            for suffix in ["", "-wal", "-shm"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }
}
