//! Collector: runs two walkers concurrently and compares what they stream.
//!
//! Each tree gets its own walker thread and channel. The collector drains the
//! channels on the calling thread and compares the two sequences by in-order
//! content only, so differently shaped trees holding the same values are
//! equivalent.

use std::thread;
use std::time::Duration;

use clap::ValueEnum;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use itertools::{EitherOrBoth, Itertools};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::application::error::{CollectError, Side};
use crate::application::walker::{spawn_walker, WalkOutcome};
use crate::domain::{Tree, Value};

/// How many values the collector takes from each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    /// Receive until the walker closes its channel.
    #[default]
    UntilClosed,
    /// Receive exactly this many values; fewer is a short traversal.
    Fixed(usize),
}

/// Order in which the two channels are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Drain the left channel completely, then the right one.
    #[default]
    Sequential,
    /// Take one value from each side in turn and stop at the first mismatch.
    Lockstep,
}

/// Knobs for a single comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareOptions {
    /// Channel buffer size; 0 is a synchronous handoff.
    pub capacity: usize,
    pub count_mode: CountMode,
    pub strategy: Strategy,
    /// `None` blocks on every receive for as long as it takes.
    pub recv_timeout: Option<Duration>,
}

/// What the collector saw from one walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideReport {
    pub values: Vec<Value>,
    pub walk: WalkOutcome,
}

impl SideReport {
    pub fn received(&self) -> usize {
        self.values.len()
    }

    pub fn sent(&self) -> usize {
        self.walk.sent()
    }
}

/// Result of comparing two trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub equivalent: bool,
    pub left: SideReport,
    pub right: SideReport,
    /// Index of the first position where the sequences differ, including
    /// the position where the shorter one ends.
    pub first_divergence: Option<usize>,
}

enum RecvFailure {
    Closed,
    TimedOut(Duration),
}

fn receive(rx: &Receiver<Value>, timeout: Option<Duration>) -> Result<Value, RecvFailure> {
    match timeout {
        None => rx.recv().map_err(|_| RecvFailure::Closed),
        Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => RecvFailure::TimedOut(timeout),
            RecvTimeoutError::Disconnected => RecvFailure::Closed,
        }),
    }
}

/// Decides whether a failed receive is a normal end of stream.
fn end_of_stream(
    side: Side,
    failure: RecvFailure,
    received: usize,
    count_mode: CountMode,
) -> Result<(), CollectError> {
    match (failure, count_mode) {
        (RecvFailure::TimedOut(timeout), _) => Err(CollectError::Stalled {
            side,
            received,
            timeout,
        }),
        (RecvFailure::Closed, CountMode::UntilClosed) => Ok(()),
        (RecvFailure::Closed, CountMode::Fixed(expected)) => Err(CollectError::ShortTraversal {
            side,
            expected,
            received,
        }),
    }
}

fn reached(count_mode: CountMode, received: usize) -> bool {
    matches!(count_mode, CountMode::Fixed(expected) if received >= expected)
}

/// Receives from one channel into an append-only sequence.
///
/// Without a timeout this blocks for as long as the sender stays open
/// without sending.
#[instrument(level = "debug", skip(rx))]
pub fn drain(
    side: Side,
    rx: &Receiver<Value>,
    count_mode: CountMode,
    timeout: Option<Duration>,
) -> Result<Vec<Value>, CollectError> {
    let mut values = Vec::new();
    while !reached(count_mode, values.len()) {
        match receive(rx, timeout) {
            Ok(value) => values.push(value),
            Err(failure) => {
                end_of_stream(side, failure, values.len(), count_mode)?;
                break;
            }
        }
    }
    debug!(received = values.len(), "drained");
    Ok(values)
}

fn drain_lockstep(
    rx_left: &Receiver<Value>,
    rx_right: &Receiver<Value>,
    options: &CompareOptions,
) -> Result<(Vec<Value>, Vec<Value>), CollectError> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    while !reached(options.count_mode, left.len()) {
        match (
            receive(rx_left, options.recv_timeout),
            receive(rx_right, options.recv_timeout),
        ) {
            (Ok(a), Ok(b)) => {
                left.push(a);
                right.push(b);
                if a != b {
                    debug!(index = left.len() - 1, a, b, "mismatch, stopping early");
                    break;
                }
            }
            (a, b) => {
                let sides = [(Side::Left, a, &mut left), (Side::Right, b, &mut right)];
                for (side, result, values) in sides {
                    match result {
                        Ok(value) => values.push(value),
                        Err(failure) => {
                            end_of_stream(side, failure, values.len(), options.count_mode)?
                        }
                    }
                }
                break;
            }
        }
    }
    Ok((left, right))
}

fn first_divergence(left: &[Value], right: &[Value]) -> Option<usize> {
    left.iter()
        .zip_longest(right)
        .position(|pair| !matches!(pair, EitherOrBoth::Both(a, b) if a == b))
}

fn spawn_error(side: Side, e: std::io::Error) -> CollectError {
    CollectError::Spawn {
        side,
        message: e.to_string(),
    }
}

/// Rejects a tree whose known node count cannot satisfy a fixed count.
fn check_expected(side: Side, tree: &Tree, count_mode: CountMode) -> Result<(), CollectError> {
    match count_mode {
        CountMode::Fixed(expected) if tree.len() < expected => {
            Err(CollectError::ShortTraversal {
                side,
                expected,
                received: tree.len(),
            })
        }
        _ => Ok(()),
    }
}

/// Walks a single tree on its own thread and collects what it streams.
#[instrument(level = "debug", skip(tree), fields(nodes = tree.len()))]
pub fn collect(tree: &Tree, options: &CompareOptions) -> Result<SideReport, CollectError> {
    let side = Side::Left;
    check_expected(side, tree, options.count_mode)?;
    thread::scope(|scope| {
        let (rx, handle) = spawn_walker(scope, side.walker_name(), tree, options.capacity)
            .map_err(|e| spawn_error(side, e))?;
        let values = drain(side, &rx, options.count_mode, options.recv_timeout);
        drop(rx);
        let walk = handle
            .join()
            .map_err(|_| CollectError::WalkerPanicked { side })?;
        Ok(SideReport {
            values: values?,
            walk,
        })
    })
}

/// Walks both trees concurrently and compares their in-order sequences.
///
/// In `CountMode::Fixed` mode a tree known to be smaller than the expected
/// count is rejected before any thread starts.
#[instrument(level = "debug", skip(left, right), fields(left_nodes = left.len(), right_nodes = right.len()))]
pub fn compare(
    left: &Tree,
    right: &Tree,
    options: &CompareOptions,
) -> Result<Comparison, CollectError> {
    check_expected(Side::Left, left, options.count_mode)?;
    check_expected(Side::Right, right, options.count_mode)?;

    thread::scope(|scope| {
        let (rx_left, handle_left) =
            spawn_walker(scope, Side::Left.walker_name(), left, options.capacity)
                .map_err(|e| spawn_error(Side::Left, e))?;
        let (rx_right, handle_right) =
            spawn_walker(scope, Side::Right.walker_name(), right, options.capacity)
                .map_err(|e| spawn_error(Side::Right, e))?;

        let (count_mode, timeout) = (options.count_mode, options.recv_timeout);
        let collected = match options.strategy {
            Strategy::Sequential => drain(Side::Left, &rx_left, count_mode, timeout).and_then(|l| {
                drain(Side::Right, &rx_right, count_mode, timeout).map(|r| (l, r))
            }),
            Strategy::Lockstep => drain_lockstep(&rx_left, &rx_right, options),
        };

        // A walker blocked in send only returns once its receiver is gone.
        drop(rx_left);
        drop(rx_right);
        let walk_left = handle_left
            .join()
            .map_err(|_| CollectError::WalkerPanicked { side: Side::Left })?;
        let walk_right = handle_right
            .join()
            .map_err(|_| CollectError::WalkerPanicked { side: Side::Right })?;

        let (left_values, right_values) = collected?;
        let first_divergence = first_divergence(&left_values, &right_values);
        let comparison = Comparison {
            equivalent: first_divergence.is_none(),
            left: SideReport {
                values: left_values,
                walk: walk_left,
            },
            right: SideReport {
                values: right_values,
                walk: walk_right,
            },
            first_divergence,
        };
        debug!(
            equivalent = comparison.equivalent,
            left_received = comparison.left.received(),
            right_received = comparison.right.received(),
            "comparison done"
        );
        Ok(comparison)
    })
}

/// True iff both trees hold the same values in the same in-order sequence.
pub fn same(left: &Tree, right: &Tree) -> bool {
    same_with(left, right, &CompareOptions::default())
}

/// [`same`] with explicit options; any protocol failure counts as "not the same".
pub fn same_with(left: &Tree, right: &Tree, options: &CompareOptions) -> bool {
    match compare(left, right, options) {
        Ok(comparison) => comparison.equivalent,
        Err(e) => {
            warn!(error = %e, "comparison failed, trees treated as different");
            false
        }
    }
}
