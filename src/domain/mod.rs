//! Domain layer: the binary tree model
//!
//! This layer is independent of external concerns (no threads, no CLI, no config loading).

pub mod error;
pub mod tree;
pub mod tree_traits;

pub use error::{DomainError, DomainResult};
pub use tree::{InOrder, Node, Tree, Value, CANONICAL_SIZE, MAX_SIZE};
pub use tree_traits::TreeNodeConvert;
