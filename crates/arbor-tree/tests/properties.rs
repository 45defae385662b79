//! Property tests for the recorded tree operations.

use std::collections::BTreeSet;

use arbor_tree::{layout, ops, Discard, LayoutOptions, Outcome, Tree};
use proptest::prelude::*;

fn values() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-200i32..200, 0..64)
}

fn distinct_sorted(vs: &[i32]) -> Vec<i32> {
    vs.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

proptest! {
    #[test]
    fn build_round_trips_membership(vs in values()) {
        let run = ops::build(vs.clone());
        let expected = distinct_sorted(&vs);
        let keys = run.final_snapshot().map(|s| s.inorder()).unwrap_or_default();
        prop_assert_eq!(keys, expected);
    }

    #[test]
    fn committed_trees_are_red_black(vs in values()) {
        let run = ops::build(vs);
        prop_assert!(run.tree.check_invariants().is_ok());
        if let Some(last) = run.final_snapshot() {
            prop_assert!(last.check_invariants().is_ok());
        }
    }

    #[test]
    fn every_step_is_ordered_and_linked(vs in values()) {
        let run = ops::build(vs);
        for step in &run.steps {
            prop_assert!(step.snapshot.check_structure().is_ok(), "{}", step.explanation);
        }
    }

    #[test]
    fn each_insert_ends_red_black(vs in values(), extra in -200i32..200) {
        let base = ops::build_instant(vs);
        let run = ops::insert(&base, extra);
        let last = run.final_snapshot().expect("insert always records a step");
        prop_assert!(last.check_invariants().is_ok());
        prop_assert!(last.contains(&extra));
    }

    #[test]
    fn duplicate_insert_is_idempotent(vs in prop::collection::vec(-50i32..50, 1..40), pick in any::<prop::sample::Index>()) {
        let base = ops::build_instant(vs.clone());
        let existing = vs[pick.index(vs.len())];
        let run = ops::insert(&base, existing);
        prop_assert_eq!(run.steps.len(), 1);
        let is_duplicate = matches!(run.outcome, Outcome::Duplicate { .. });
        prop_assert!(is_duplicate, "expected a duplicate, got {:?}", run.outcome);
        prop_assert_eq!(run.tree.snapshot(), base.snapshot());
    }

    #[test]
    fn delete_then_absent(vs in prop::collection::vec(-50i32..50, 1..40), pick in any::<prop::sample::Index>()) {
        let base = ops::build_instant(vs.clone());
        let target = vs[pick.index(vs.len())];
        let run = ops::delete(&base, &target);
        let last = run.final_snapshot().expect("delete always records a step");
        prop_assert!(!last.contains(&target));
        prop_assert!(last.check_invariants().is_ok());
        let mut expected = distinct_sorted(&vs);
        expected.retain(|v| *v != target);
        prop_assert_eq!(last.inorder(), expected);

        let again = ops::delete(&run.tree, &target);
        prop_assert_eq!(again.steps.len(), 1);
        prop_assert_eq!(again.outcome, Outcome::NotFound);
    }

    #[test]
    fn update_ends_red_black(vs in prop::collection::vec(-50i32..50, 1..40), pick in any::<prop::sample::Index>(), new in -60i32..60) {
        let base = ops::build_instant(vs.clone());
        let old = vs[pick.index(vs.len())];
        let run = ops::update(&base, &old, new);
        let last = run.final_snapshot().expect("update always records a step");
        prop_assert!(last.check_invariants().is_ok());
        prop_assert!(last.contains(&new));
        prop_assert!(old == new || !last.contains(&old));
    }

    #[test]
    fn layout_slots_follow_inorder(vs in values()) {
        let tree: Tree<i32> = ops::build_instant(vs);
        let placed = layout(&tree, &LayoutOptions::default());
        let laid_out: Vec<_> = placed.nodes.iter().map(|n| n.value).collect();
        prop_assert_eq!(laid_out, tree.inorder());
        prop_assert_eq!(placed.edges.len(), tree.len().saturating_sub(1));
    }

    #[test]
    fn snapshots_never_alias(vs in prop::collection::vec(-100i32..100, 2..30)) {
        let run = ops::build(vs);
        let frozen: Vec<_> = run.steps.iter().map(|s| s.snapshot.clone()).collect();
        for step in &run.steps {
            let mut working = step.snapshot.to_tree();
            ops::insert_with(&mut working, 1_000, &mut Discard);
        }
        let mut committed = run.tree.clone();
        ops::insert_with(&mut committed, -1_000, &mut Discard);
        for (before, step) in frozen.iter().zip(run.steps.iter()) {
            prop_assert_eq!(before, &step.snapshot);
            prop_assert!(!step.snapshot.contains(&1_000));
            prop_assert!(!step.snapshot.contains(&-1_000));
        }
    }
}

#[test]
fn deterministic_replay() {
    let vs = [41, 38, 31, 12, 19, 8];
    let a = ops::build(vs);
    let b = ops::build(vs);
    assert_eq!(a.steps, b.steps);
}
