//! Application layer: walkers and the collector
//!
//! This layer runs the concurrent traversal protocol over domain trees.

pub mod collector;
pub mod error;
pub mod walker;

pub use collector::{
    collect, compare, drain, same, same_with, CompareOptions, Comparison, CountMode, SideReport,
    Strategy,
};
pub use error::{ApplicationError, CollectError, Side};
pub use walker::{spawn_walker, walk, walk_tree, WalkAborted, WalkOutcome};
