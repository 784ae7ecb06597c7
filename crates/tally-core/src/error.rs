//! # Error Types
//!
//! Domain error taxonomy for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Expected domain outcomes (not bugs)            │
//! │  └── ValidationError  - Malformed or out-of-range input                │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Storage failures (never shown verbatim)        │
//! │  └── LedgerError      - What coordinator callers receive               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! │        DbError ──(logged)──────────► LedgerError::Internal             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain errors are returned synchronously and never retried by the core.

use thiserror::Error;

use crate::money::Money;
use crate::types::InstrumentKind;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors produced by the reconciliation rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Entity absent, or present but outside the caller's store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation collides with existing state (e.g. a second open shift).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The instrument is already PAID.
    ///
    /// ## User Workflow
    /// ```text
    /// Pay receivable (balance 0, status PAID)
    ///      │
    ///      ▼
    /// AlreadySettled { kind: Receivable, id }
    ///      │
    ///      ▼
    /// UI shows: "receivable ... is already settled"
    /// ```
    #[error("{kind} {id} is already settled")]
    AlreadySettled { kind: InstrumentKind, id: String },

    /// The shift is CLOSED and frozen.
    #[error("Shift {shift_id} is already closed")]
    AlreadyClosed { shift_id: String },

    /// The purchase order was received before.
    #[error("Purchase order {order_id} has already been received")]
    AlreadyReceived { order_id: String },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Payment larger than what is still owed.
    #[error("payment of {amount} exceeds outstanding balance of {balance}")]
    ExceedsBalance { amount: Money, balance: Money },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
