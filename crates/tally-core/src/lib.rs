//! # tally-core: Pure Reconciliation Logic for Tally POS
//!
//! This crate holds the money rules of the Tally POS back office: accounts
//! receivable/payable, the payment ledger, cash-register shift accrual and
//! purchase receiving. Everything here is a pure function over plain values;
//! the database crate commits the results atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Request handlers (HTTP, auth, catalog CRUD)            │   │
//! │  │    resolve store + actor, call the ledger, render the result    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               tally-db::Ledger (coordinator)                    │   │
//! │  │   one sqlx transaction per operation, commit or full rollback   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │instrument │  │   shift   │  │ receiving │  │   money   │  │   │
//! │  │   │ balances  │  │ accrual   │  │ stock +   │  │ integer   │  │   │
//! │  │   │ statuses  │  │ close     │  │ payables  │  │ cents     │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (DebtInstrument, PaymentTransaction, Shift, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//! - [`instrument`] - Status derivation and payment application
//! - [`shift`] - Accrual routing and shift close arithmetic
//! - [`receiving`] - Purchase receipt planning
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tally_core::{DebtInstrument, InstrumentStatus, Money, NewInstrument};
//!
//! let mut receivable = DebtInstrument::receivable(
//!     "store-1",
//!     "cashier-7",
//!     NewInstrument::new("client-42", Money::from_cents(100_000)),
//!     Utc::now(),
//! );
//!
//! receivable.apply_payment(Money::from_cents(40_000)).unwrap();
//! assert_eq!(receivable.status, InstrumentStatus::Partial);
//! assert_eq!(receivable.balance().cents(), 60_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod instrument;
pub mod money;
pub mod receiving;
pub mod shift;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Days until a payable falls due when the caller gives no due date.
pub const DEFAULT_PAYABLE_TERM_DAYS: i64 = 30;

/// Maximum length of a free-form payment reference (check number, transfer id).
pub const MAX_REFERENCE_LEN: usize = 100;

/// Maximum length of free-form notes on instruments and shifts.
pub const MAX_NOTES_LEN: usize = 500;
