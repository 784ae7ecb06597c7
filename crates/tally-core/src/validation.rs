//! # Validation Module
//!
//! Input validation for ledger operations.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Request handler (outside this repo)                          │
//! │  └── Deserialization, authentication, store resolution                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Amounts, quantities, actor, reference lengths                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── CHECK constraints, partial unique index, append-only triggers     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::validation::validate_payment_amount;
//!
//! assert!(validate_payment_amount(Money::from_cents(4000)).is_ok());
//! assert!(validate_payment_amount(Money::zero()).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_NOTES_LEN, MAX_REFERENCE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a required identifier-like field is present.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates the actor recorded on ledger rows.
pub fn validate_actor(actor: &str) -> ValidationResult<()> {
    validate_required("actor", actor)
}

/// Validates an optional free-form payment reference.
///
/// ```rust
/// use tally_core::validation::validate_reference;
///
/// assert!(validate_reference(Some("CHK-000918")).is_ok());
/// assert!(validate_reference(None).is_ok());
/// assert!(validate_reference(Some(&"x".repeat(101))).is_err());
/// ```
pub fn validate_reference(reference: Option<&str>) -> ValidationResult<()> {
    validate_max_len("reference", reference, MAX_REFERENCE_LEN)
}

/// Validates optional notes.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    validate_max_len("notes", notes, MAX_NOTES_LEN)
}

fn validate_max_len(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }
    Ok(())
}

/// Validates the total of a new receivable or payable.
pub fn validate_instrument_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates a cash figure (drawer balance, counted total).
///
/// ## Rules
/// - Must be non-negative (>= 0); an empty drawer is allowed
pub fn validate_cash_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a received quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit cost (zero allowed for free goods).
pub fn validate_unit_cost(cost: Money) -> ValidationResult<()> {
    validate_cash_amount("unit cost", cost)
}

// =============================================================================
// Unit Tests
// =============================================================================
