//! # Repository Module
//!
//! Transaction-scoped SQL for every table of the reconciliation core.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories Take the Connection                     │
//! │                                                                         │
//! │  Ledger::pay_receivable                                                │
//! │       │                                                                 │
//! │       │  let mut tx = pool.begin().await?;                             │
//! │       ▼                                                                 │
//! │  instrument::bump_version(&mut tx, ..)   ← first write takes the lock  │
//! │  instrument::find(&mut tx, ..)                                         │
//! │  instrument::update_balance(&mut tx, ..) ← conditional on old balance  │
//! │  payment::insert(&mut tx, ..)                                          │
//! │  shift::accrue(&mut tx, ..)              ← col = col + amount          │
//! │  purchase::set_payment_status(&mut tx, ..)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit().await?   (drop without commit = rollback)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes `&mut SqliteConnection`, so the same code runs on a
//! pooled connection for reads and inside a transaction for writes. None of
//! them begin or commit; that belongs to [`crate::ledger`].
//!
//! Conditional writes return `bool` (`rows_affected() > 0`) and leave the
//! NotFound / AlreadyClosed decision to the caller.

pub mod instrument;
pub mod inventory;
pub mod payment;
pub mod purchase;
pub mod shift;
