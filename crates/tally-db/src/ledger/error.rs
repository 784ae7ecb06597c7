//! # Ledger Errors
//!
//! What callers of [`crate::Ledger`] receive.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError::Validation      ──► Domain ──► VALIDATION_ERROR             │
//! │  CoreError::NotFound        ──► Domain ──► NOT_FOUND                    │
//! │  DbError::NotFound          ──► Domain ──► NOT_FOUND                    │
//! │  CoreError::Conflict        ──► Domain ──► CONFLICT                     │
//! │  CoreError::AlreadySettled  ──► Domain ──► ALREADY_SETTLED              │
//! │  CoreError::AlreadyClosed   ──► Domain ──► ALREADY_CLOSED               │
//! │  CoreError::AlreadyReceived ──► Domain ──► ALREADY_RECEIVED             │
//! │  any other DbError          ──► error!(..) logged ──► Internal          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain errors are expected outcomes: return them to the user, don't retry.
//! `Internal` never carries storage detail; the detail is in the logs.

use serde::Serialize;
use tally_core::{CoreError, ValidationError};
use thiserror::Error;
use tracing::error;

use crate::error::DbError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Error returned by every ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// An expected domain outcome.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unexpected failure. The message is safe to show.
    #[error("{0}")]
    Internal(String),
}

/// Machine-readable error codes.
///
/// ```json
/// { "code": "ALREADY_SETTLED", "message": "receivable 1f0c... is already settled" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Conflict,
    AlreadySettled,
    AlreadyClosed,
    AlreadyReceived,
    Internal,
}

/// Serializable `{ code, message }` pair for callers that render errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Domain(err) => match err {
                CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::Conflict(_) => ErrorCode::Conflict,
                CoreError::AlreadySettled { .. } => ErrorCode::AlreadySettled,
                CoreError::AlreadyClosed { .. } => ErrorCode::AlreadyClosed,
                CoreError::AlreadyReceived { .. } => ErrorCode::AlreadyReceived,
            },
            LedgerError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// The domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Domain(err) => Some(err),
            LedgerError::Internal(_) => None,
        }
    }

    /// Logs `detail` for operators and returns the generic internal error.
    pub(crate) fn internal(detail: impl std::fmt::Display) -> Self {
        error!(detail = %detail, "Ledger operation failed");
        LedgerError::Internal(INTERNAL_MESSAGE.to_string())
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Domain(CoreError::Validation(err))
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::Domain(CoreError::NotFound { entity, id }),
            other => LedgerError::internal(other),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
