//! Rendering trees for terminal display.

use termtree::Tree as TermTree;

use crate::domain::tree::{Node, Tree};

/// Marker for a missing child whose sibling exists.
const EMPTY_SLOT: &str = "·";

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> TermTree<String>;
}

impl TreeNodeConvert for Node {
    fn to_tree_string(&self) -> TermTree<String> {
        let leaves: Vec<_> = match (self.left(), self.right()) {
            (None, None) => Vec::new(),
            (left, right) => [left, right]
                .into_iter()
                .map(|child| match child {
                    Some(node) => node.to_tree_string(),
                    None => TermTree::new(EMPTY_SLOT.to_string()),
                })
                .collect(),
        };
        TermTree::new(self.value().to_string()).with_leaves(leaves)
    }
}

impl TreeNodeConvert for Tree {
    fn to_tree_string(&self) -> TermTree<String> {
        match self.root() {
            Some(root) => root.to_tree_string(),
            None => TermTree::new("Empty tree".to_string()),
        }
    }
}
