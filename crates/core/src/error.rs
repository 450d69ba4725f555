//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Rejection of a product, client or ledger value before it reaches storage.
///
/// Raised by input validation, by quantity arithmetic that would go negative
/// or overflow, and by id parsing. Storage and transfer failures have their
/// own error types in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request field was rejected (blank name, negative price, bad email).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A quantity update would leave a record negative or overflow.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A product or client id did not parse as a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
