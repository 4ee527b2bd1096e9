//! Tests for concurrent tree comparison

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;

use treewalk::application::{
    collect, compare, drain, same, same_with, CollectError, CompareOptions, CountMode, Side,
    Strategy,
};
use treewalk::domain::{Tree, Value};
use treewalk::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn options(capacity: usize, strategy: Strategy) -> CompareOptions {
    CompareOptions {
        capacity,
        strategy,
        ..CompareOptions::default()
    }
}

#[test]
fn given_one_tree_when_compared_with_itself_then_same() {
    let tree = Tree::new(1);

    assert!(same(&tree, &tree));
}

#[rstest]
#[case(1, 1, true)]
#[case(2, 2, true)]
#[case(1, 2, false)]
#[case(3, -3, false)]
fn given_two_seeds_when_comparing_then_same_iff_seeds_match(
    #[case] a: i32,
    #[case] b: i32,
    #[case] expected: bool,
) {
    assert_eq!(same(&Tree::new(a), &Tree::new(b)), expected);
}

#[rstest]
fn given_capacity_and_strategy_when_comparing_twins_then_both_walks_complete(
    #[values(0, 1, 3, 100)] capacity: usize,
    #[values(Strategy::Sequential, Strategy::Lockstep)] strategy: Strategy,
) {
    let left = Tree::new(4);
    let right = Tree::new(4);

    let comparison = compare(&left, &right, &options(capacity, strategy)).unwrap();

    assert!(comparison.equivalent);
    assert_eq!(comparison.first_divergence, None);
    for side in [&comparison.left, &comparison.right] {
        assert!(side.walk.is_completed());
        assert_eq!(side.sent(), 10);
        assert_eq!(side.received(), 10);
    }
}

#[test]
fn given_different_shapes_with_same_content_when_comparing_then_same() {
    let mut rng = StdRng::seed_from_u64(42);
    let shuffled = Tree::shuffled(1, 10, &mut rng).unwrap();
    let canonical = Tree::new(1);

    assert!(same(&shuffled, &canonical));
}

#[test]
fn given_prefix_tree_when_comparing_then_divergence_at_shorter_length() {
    let short = Tree::balanced(1, 6).unwrap();
    let long = Tree::new(1);

    let comparison = compare(&short, &long, &CompareOptions::default()).unwrap();

    assert!(!comparison.equivalent);
    assert_eq!(comparison.first_divergence, Some(6));
    assert_eq!(comparison.left.received(), 6);
    assert_eq!(comparison.right.received(), 10);
}

#[test]
fn given_empty_trees_when_comparing_then_same() {
    assert!(same(&Tree::empty(), &Tree::empty()));
    assert!(!same(&Tree::empty(), &Tree::new(1)));
}

#[test]
fn given_early_mismatch_when_comparing_lockstep_then_walkers_are_abandoned() {
    let left = Tree::balanced(1, 500).unwrap();
    let right = Tree::balanced(2, 500).unwrap();

    let comparison = compare(&left, &right, &options(0, Strategy::Lockstep)).unwrap();

    assert!(!comparison.equivalent);
    // 1 vs 2 at index 0
    assert_eq!(comparison.first_divergence, Some(0));
    assert_eq!(comparison.left.values, vec![1]);
    assert_eq!(comparison.right.values, vec![2]);
    assert!(!comparison.left.walk.is_completed());
    assert!(!comparison.right.walk.is_completed());
}

#[test]
fn given_fixed_count_above_tree_size_when_comparing_then_fails_fast() {
    let options = CompareOptions {
        count_mode: CountMode::Fixed(10),
        ..CompareOptions::default()
    };
    let small = Tree::balanced(1, 4).unwrap();

    let err = compare(&Tree::new(1), &small, &options).unwrap_err();

    assert_eq!(
        err,
        CollectError::ShortTraversal {
            side: Side::Right,
            expected: 10,
            received: 4
        }
    );
    assert!(!same_with(&Tree::new(1), &small, &options));
}

#[test]
fn given_fixed_count_below_tree_size_when_comparing_then_only_prefix_is_compared() {
    let options = CompareOptions {
        count_mode: CountMode::Fixed(3),
        ..CompareOptions::default()
    };

    let comparison = compare(&Tree::new(1), &Tree::balanced(1, 50).unwrap(), &options).unwrap();

    assert!(comparison.equivalent);
    assert_eq!(comparison.left.values, vec![1, 2, 3]);
    assert_eq!(comparison.right.values, vec![1, 2, 3]);
}

#[test]
fn given_open_silent_sender_when_draining_without_timeout_then_collector_blocks() {
    let (tx, rx) = bounded::<Value>(0);
    let (done_tx, done_rx) = bounded(1);

    thread::spawn(move || {
        let result = drain(Side::Left, &rx, CountMode::Fixed(3), None);
        let _ = done_tx.send(result);
    });
    tx.send(1).unwrap();

    // Still waiting for values two and three
    assert_eq!(
        done_rx.recv_timeout(Duration::from_millis(100)).unwrap_err(),
        RecvTimeoutError::Timeout
    );

    // Closing the channel releases the collector with a short traversal
    drop(tx);
    let result = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        result.unwrap_err(),
        CollectError::ShortTraversal {
            side: Side::Left,
            expected: 3,
            received: 1
        }
    );
}

#[test]
fn given_silent_sender_when_draining_with_timeout_then_stalled() {
    let (tx, rx) = bounded::<Value>(4);
    tx.send(7).unwrap();
    let timeout = Duration::from_millis(30);

    let err = drain(Side::Right, &rx, CountMode::UntilClosed, Some(timeout)).unwrap_err();

    assert_eq!(
        err,
        CollectError::Stalled {
            side: Side::Right,
            received: 1,
            timeout
        }
    );
    drop(tx);
}

#[test]
fn given_timeout_when_comparing_healthy_walkers_then_no_stall() {
    let options = CompareOptions {
        recv_timeout: Some(Duration::from_secs(5)),
        ..CompareOptions::default()
    };

    assert!(same_with(&Tree::new(9), &Tree::new(9), &options));
}

#[test]
fn given_single_tree_when_collecting_then_values_in_order() {
    let report = collect(&Tree::new(5), &CompareOptions::default()).unwrap();

    assert_eq!(report.values, (1..=10).map(|k| 5 * k).collect::<Vec<_>>());
    assert_eq!(report.sent(), report.received());
    assert!(report.walk.is_completed());
}
