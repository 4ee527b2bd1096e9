//! Application-level errors (wraps domain errors)

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::domain::DomainError;

/// Which of the two compared trees an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn walker_name(&self) -> &'static str {
        match self {
            Side::Left => "walker-left",
            Side::Right => "walker-right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Failures of the collect-and-compare protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    #[error("short traversal of {side} tree: expected {expected} values, received {received}")]
    ShortTraversal {
        side: Side,
        expected: usize,
        received: usize,
    },

    #[error("{side} walker stalled after {received} values: nothing received within {timeout:?}")]
    Stalled {
        side: Side,
        received: usize,
        timeout: Duration,
    },

    #[error("{side} walker panicked")]
    WalkerPanicked { side: Side },

    #[error("cannot spawn {side} walker: {message}")]
    Spawn { side: Side, message: String },
}

/// Application errors wrap domain and protocol errors and add configuration concerns.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Collect(#[from] CollectError),

    #[error("config error: {message}")]
    Config { message: String },
}
