//! The module contains the error the engine can throw.
//!
//! Every error is returned before the store is touched, with two exceptions
//! that are raised while a write-set is being applied:
//!
//! - [`AtomicityFailure`] a write failed after earlier writes of the same
//!   operation succeeded. The whole write-set is rolled back.
//! - [`Database`] the storage layer itself failed.
//!
//! [`LockTimeout`] is the only retryable error.
//!
//!  [`AtomicityFailure`]: EngineError::AtomicityFailure
//!  [`Database`]: EngineError::Database
//!  [`LockTimeout`]: EngineError::LockTimeout
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Referential conflict: {0}")]
    ReferentialConflict(String),
    #[error("System generated transaction: {0}")]
    SystemGeneratedTransaction(String),
    #[error("Atomicity failure: {0}")]
    AtomicityFailure(String),
    #[error("Lock timeout: {0}")]
    LockTimeout(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the caller may retry the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::ReferentialConflict(a), Self::ReferentialConflict(b)) => a == b,
            (Self::SystemGeneratedTransaction(a), Self::SystemGeneratedTransaction(b)) => a == b,
            (Self::AtomicityFailure(a), Self::AtomicityFailure(b)) => a == b,
            (Self::LockTimeout(a), Self::LockTimeout(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
