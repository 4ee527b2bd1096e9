//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::{ApplicationError, CollectError};
use crate::domain::DomainError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::Application(e.into())
    }
}

impl From<CollectError> for CliError {
    fn from(e: CollectError) -> Self {
        CliError::Application(e.into())
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::Io(_) => crate::exitcode::IOERR,
            CliError::Application(e) => match e {
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Domain(_) => crate::exitcode::DATAERR,
                ApplicationError::Collect(CollectError::ShortTraversal { .. }) => {
                    crate::exitcode::DATAERR
                }
                ApplicationError::Collect(CollectError::Stalled { .. }) => {
                    crate::exitcode::UNAVAILABLE
                }
                ApplicationError::Collect(_) => crate::exitcode::SOFTWARE,
            },
        }
    }
}
