//! In-order walker: streams the values of one tree into a channel.

use std::io;
use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::domain::{Node, Tree, Value};

/// Stack size for walker threads, deep enough for a degenerate tree of `MAX_SIZE` nodes.
pub const WALKER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// The receiving end went away before the walk finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("receiver dropped after {sent} values")]
pub struct WalkAborted {
    pub sent: usize,
}

/// How a walker thread ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// Every node was sent.
    Completed { sent: usize },
    /// The collector stopped listening; the walk stopped at the next send.
    Abandoned { sent: usize },
}

impl WalkOutcome {
    pub fn sent(&self) -> usize {
        match *self {
            WalkOutcome::Completed { sent } | WalkOutcome::Abandoned { sent } => sent,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WalkOutcome::Completed { .. })
    }
}

/// Sends every value of the subtree rooted at `node` to `tx`, in order.
///
/// Each send blocks until the receiver takes the value (or buffer space frees
/// up). Returns the number of values sent.
pub fn walk(node: &Node, tx: &Sender<Value>) -> Result<usize, WalkAborted> {
    let mut sent = 0;
    walk_counted(node, tx, &mut sent)?;
    Ok(sent)
}

fn walk_counted(node: &Node, tx: &Sender<Value>, sent: &mut usize) -> Result<(), WalkAborted> {
    if let Some(left) = node.left() {
        walk_counted(left, tx, sent)?;
    }
    tx.send(node.value()).map_err(|_| WalkAborted { sent: *sent })?;
    *sent += 1;
    trace!(value = node.value(), "sent");
    if let Some(right) = node.right() {
        walk_counted(right, tx, sent)?;
    }
    Ok(())
}

/// Walks a whole tree and closes the channel by dropping `tx` on return.
///
/// The closed channel is the end-of-sequence marker for the collector.
#[instrument(level = "debug", skip(tree, tx), fields(nodes = tree.len()))]
pub fn walk_tree(tree: &Tree, tx: Sender<Value>) -> WalkOutcome {
    let result = match tree.root() {
        Some(root) => walk(root, &tx),
        None => Ok(0),
    };
    match result {
        Ok(sent) => {
            debug!(sent, "walk completed");
            WalkOutcome::Completed { sent }
        }
        Err(WalkAborted { sent }) => {
            debug!(sent, "receiver gone, walk abandoned");
            WalkOutcome::Abandoned { sent }
        }
    }
}

/// Starts a walker for `tree` on a named scoped thread.
///
/// `capacity` 0 gives a rendezvous channel: every send waits for a receive.
pub fn spawn_walker<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    name: &str,
    tree: &'env Tree,
    capacity: usize,
) -> io::Result<(Receiver<Value>, ScopedJoinHandle<'scope, WalkOutcome>)> {
    let (tx, rx) = bounded(capacity);
    let handle = thread::Builder::new()
        .name(name.to_string())
        .stack_size(WALKER_STACK_SIZE)
        .spawn_scoped(scope, move || walk_tree(tree, tx))?;
    debug!(name, capacity, "walker spawned");
    Ok((rx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn given_canonical_tree_when_walking_then_sends_in_order() {
        let tree = Tree::new(1);
        let (tx, rx) = unbounded();

        let sent = walk(tree.root().unwrap(), &tx).unwrap();
        drop(tx);

        assert_eq!(sent, 10);
        assert_eq!(rx.iter().collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn given_subtree_root_when_walking_then_sends_only_that_subtree() {
        let tree = Tree::new(1);
        let left = tree.root().unwrap().left().unwrap();
        let (tx, rx) = unbounded();

        let sent = walk(left, &tx).unwrap();
        drop(tx);

        assert_eq!(sent, 4);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn given_dropped_receiver_when_walking_then_aborts_at_first_send() {
        let tree = Tree::new(1);
        let (tx, rx) = bounded(0);
        drop(rx);

        let outcome = walk_tree(&tree, tx);

        assert_eq!(outcome, WalkOutcome::Abandoned { sent: 0 });
        assert!(!outcome.is_completed());
    }

    #[test]
    fn given_empty_tree_when_walking_then_completes_without_sending() {
        let (tx, rx) = unbounded();

        let outcome = walk_tree(&Tree::empty(), tx);

        assert_eq!(outcome, WalkOutcome::Completed { sent: 0 });
        assert!(rx.recv().is_err(), "channel must be closed");
    }

    #[test]
    fn given_buffered_receiver_that_stops_early_when_walking_then_reports_partial_count() {
        let tree = Tree::new(1);
        let (tx, rx) = bounded(3);
        let outcome = thread::scope(|s| {
            let handle = s.spawn(|| walk_tree(&tree, tx));
            assert_eq!(rx.recv().unwrap(), 1);
            drop(rx);
            handle.join().unwrap()
        });

        // the first value plus at most the three buffered ones made it out
        assert!(matches!(outcome, WalkOutcome::Abandoned { sent } if (1..=4).contains(&sent)));
    }
}
