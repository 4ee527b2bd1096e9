//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent invalid tree construction requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("tree size {size} exceeds maximum of {max} nodes")]
    SizeTooLarge { size: usize, max: usize },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
