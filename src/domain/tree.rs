//! Binary tree of integer values.
//!
//! Nodes own their children exclusively and are never mutated after the
//! tree is built, so a `&Tree` can be shared freely between walker threads.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};

/// Value carried by every node.
pub type Value = i64;

/// Node count of the tree built by [`Tree::new`].
pub const CANONICAL_SIZE: usize = 10;

/// Largest tree the constructors will build.
///
/// Only the walk recurses, and it runs on the 64 MiB walker thread stack
/// where a degenerate chain of this size still fits.
pub const MAX_SIZE: usize = 1 << 16;

/// Tree node in the owned binary tree structure.
pub struct Node {
    value: Value,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn leaf(value: Value) -> Self {
        Self {
            value,
            left: None,
            right: None,
        }
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node> {
        self.right.as_deref()
    }

    /// Number of nodes in the subtree rooted here.
    pub fn count(&self) -> usize {
        let mut pending = vec![self];
        let mut count = 0;
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.left().into_iter().chain(node.right()));
        }
        count
    }

    fn depth(&self) -> usize {
        let mut pending = vec![(self, 1)];
        let mut depth = 0;
        while let Some((node, level)) = pending.pop() {
            depth = depth.max(level);
            for child in node.left().into_iter().chain(node.right()) {
                pending.push((child, level + 1));
            }
        }
        depth
    }
}

/// Ordered binary tree with its node count computed at construction.
///
/// `Clone`, `PartialEq` and `Debug` walk the nodes with an explicit stack,
/// so a degenerate chain of `MAX_SIZE` nodes is safe on any thread.
#[derive(Default)]
pub struct Tree {
    root: Option<Box<Node>>,
    len: usize,
}

impl Tree {
    /// The canonical tree: `seed, 2*seed, ..., 10*seed` in a balanced shape.
    ///
    /// Two trees built from the same seed are identical in shape and content.
    pub fn new(seed: i32) -> Self {
        Self {
            root: Some(make_balanced(Value::from(seed), 1, CANONICAL_SIZE as Value)),
            len: CANONICAL_SIZE,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Balanced tree holding `seed * 1 ..= seed * size`.
    ///
    /// The median index becomes the root, recursively for both halves.
    #[instrument(level = "debug")]
    pub fn balanced(seed: i32, size: usize) -> DomainResult<Self> {
        check_size(size)?;
        let root = (size > 0).then(|| make_balanced(Value::from(seed), 1, size as Value));
        Ok(Self { root, len: size })
    }

    /// Binary search tree built by inserting `values` in iteration order.
    ///
    /// Smaller values go left, everything else (duplicates included) goes right.
    pub fn from_values<I>(values: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut tree = Self::empty();
        for value in values {
            check_size(tree.len + 1)?;
            tree.insert(value);
        }
        Ok(tree)
    }

    /// Same content as [`Tree::balanced`], inserted in a random permutation
    /// so the shape varies from call to call.
    #[instrument(level = "debug", skip(rng))]
    pub fn shuffled<R>(seed: i32, size: usize, rng: &mut R) -> DomainResult<Self>
    where
        R: Rng + ?Sized,
    {
        check_size(size)?;
        let mut values: Vec<Value> = (1..=size as Value)
            .map(|k| Value::from(seed) * k)
            .collect();
        values.shuffle(rng);
        Self::from_values(values)
    }

    fn insert(&mut self, value: Value) {
        let mut slot = &mut self.root;
        while let Some(node) = slot {
            slot = if value < node.value {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        *slot = Some(Box::new(Node::leaf(value)));
        self.len += 1;
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn depth(&self) -> usize {
        self.root().map_or(0, Node::depth)
    }

    /// Sequential in-order iterator, no threads or channels involved.
    pub fn values(&self) -> InOrder<'_> {
        InOrder::new(self.root())
    }
}

impl Clone for Tree {
    fn clone(&self) -> Self {
        let mut root = None;
        {
            let mut pending: Vec<(&Node, &mut Option<Box<Node>>)> = Vec::new();
            if let Some(node) = self.root() {
                pending.push((node, &mut root));
            }
            while let Some((source, slot)) = pending.pop() {
                let copy = slot.insert(Box::new(Node::leaf(source.value)));
                let Node { left, right, .. } = &mut **copy;
                if let Some(child) = source.left() {
                    pending.push((child, left));
                }
                if let Some(child) = source.right() {
                    pending.push((child, right));
                }
            }
        }
        Self {
            root,
            len: self.len,
        }
    }
}

/// Equal shape and equal values at every position.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let mut pending = vec![(self.root(), other.root())];
        while let Some(pair) = pending.pop() {
            match pair {
                (None, None) => {}
                (Some(a), Some(b)) if a.value == b.value => {
                    pending.push((a.left(), b.left()));
                    pending.push((a.right(), b.right()));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Tree {}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("len", &self.len)
            .field("values", &self.values().collect::<Vec<_>>())
            .finish()
    }
}

// Children are shown by value only.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value", &self.value)
            .field("left", &self.left().map(Node::value))
            .field("right", &self.right().map(Node::value))
            .finish()
    }
}

// Degenerate trees are long chains; unlink them iteratively instead of
// letting the boxes drop recursively.
impl Drop for Tree {
    fn drop(&mut self) {
        let mut pending: Vec<Box<Node>> = self.root.take().into_iter().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.left.take());
            pending.extend(node.right.take());
        }
    }
}

fn check_size(size: usize) -> DomainResult<()> {
    if size > MAX_SIZE {
        return Err(DomainError::SizeTooLarge {
            size,
            max: MAX_SIZE,
        });
    }
    Ok(())
}

fn make_balanced(seed: Value, from: Value, to: Value) -> Box<Node> {
    let k = from + (to - from) / 2;
    Box::new(Node {
        value: seed * k,
        left: (k > from).then(|| make_balanced(seed, from, k - 1)),
        right: (k < to).then(|| make_balanced(seed, k + 1, to)),
    })
}

/// In-order iterator driven by an explicit stack of pending ancestors.
pub struct InOrder<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> InOrder<'a> {
    fn new(root: Option<&'a Node>) -> Self {
        let mut iter = Self { stack: Vec::new() };
        iter.push_left_spine(root);
        iter
    }

    fn push_left_spine(&mut self, mut node: Option<&'a Node>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left();
        }
    }
}

impl<'a> Iterator for InOrder<'a> {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right());
        Some(node.value)
    }
}
