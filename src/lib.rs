//! Concurrent binary tree equivalence.
//!
//! Two walker threads stream the in-order values of two trees through
//! channels; a collector drains both and compares the sequences.
//!
//! ```no_run
//! use treewalk::{same, Tree};
//!
//! assert!(same(&Tree::new(1), &Tree::new(1)));
//! assert!(!same(&Tree::new(1), &Tree::new(2)));
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;

pub use application::{
    collect, compare, same, same_with, walk, CollectError, CompareOptions, Comparison, CountMode,
    Strategy,
};
pub use domain::{Node, Tree, Value};
