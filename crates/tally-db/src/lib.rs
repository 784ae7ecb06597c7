//! # tally-db: Persistence and Reconciliation for Tally POS
//!
//! SQLite storage for the reconciliation core, and the [`Ledger`] that runs
//! every money-moving operation as one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  Request handler (auth done, StoreContext resolved)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Ledger     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (ledger/)    │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ pay, open,    │    │ instrument    │    │ 001_ledger_  │  │   │
//! │  │   │ close,        │    │ payment       │    │   schema.sql │  │   │
//! │  │   │ receive       │    │ shift, ...    │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ tally-core rules (pure)                            │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Transaction-scoped SQL per table
//! - [`ledger`] - The reconciliation coordinator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::{Money, PaymentMethod, PaymentRequest, StoreContext};
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let ledger = db.ledger();
//! let ctx = StoreContext::new("store-1", "cashier-7");
//!
//! ledger.open_shift(&ctx, Money::from_cents(50_000)).await?;
//! let receipt = ledger
//!     .pay_receivable(&ctx, &receivable_id, PaymentRequest::new(Money::from_cents(40_000), PaymentMethod::Cash))
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult};
pub use ledger::{
    ErrorCode, ErrorResponse, Ledger, LedgerError, LedgerResult, PaymentReceipt, ReceiptOutcome,
    ReceiveOptions,
};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};
