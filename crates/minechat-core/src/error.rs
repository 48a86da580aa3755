//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A required field was empty
    #[error("{field} must not be empty")]
    EmptyField { field: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
