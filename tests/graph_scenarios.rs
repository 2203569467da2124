use async_trait::async_trait;

use schemaflow::{
    core::graph::{GraphError, format_path, resolve},
    migration::{Migration, MigrationDefinition, MigrationEdge, StepError},
    types::Version,
};

struct Noop;

#[async_trait]
impl Migration<()> for Noop {
    async fn up(&self, _db: &()) -> Result<(), StepError> {
        Ok(())
    }

    async fn down(&self, _db: &()) -> Result<(), StepError> {
        Ok(())
    }
}

fn def(down: Version, up: Version) -> MigrationDefinition<()> {
    MigrationDefinition::new("X", down, up, Noop)
}

fn spans(path: &[&MigrationDefinition<()>]) -> Vec<(Version, Version)> {
    path.iter().map(|d| (d.down_version(), d.up_version())).collect()
}

#[test]
fn combined_step_beats_chain_of_small_steps() {
    let defs = vec![def(0, 1), def(1, 2), def(0, 2).with_description("combined")];
    let path = resolve(&defs, Some(0), Some(2)).expect("resolve");

    assert_eq!(spans(&path), vec![(0, 2)]);
    assert_eq!(path[0].description(), Some("combined"));
}

#[test]
fn linear_chain_is_followed_in_order() {
    let defs = vec![def(1, 2), def(0, 1)];
    let path = resolve(&defs, Some(0), Some(2)).expect("resolve");
    assert_eq!(spans(&path), vec![(0, 1), (1, 2)]);
    assert_eq!(format_path(&path), "0 -> 1 -> 2");
}

#[test]
fn missing_first_step_reports_no_path_from_current() {
    let defs = vec![def(1, 2)];
    let err = resolve(&defs, Some(0), Some(2)).expect_err("must fail");
    assert_eq!(err, GraphError::NoPathFromCurrent { current: 0, target: 2 });
    assert!(err.to_string().contains("no path from the current version"));
}

#[test]
fn missing_last_step_reports_no_path_to_target() {
    let defs = vec![def(0, 1)];
    let err = resolve(&defs, Some(0), Some(2)).expect_err("must fail");
    assert_eq!(err, GraphError::NoPathToTarget { current: 0, target: 2 });
    assert!(err.to_string().contains("no path to the target version"));
}

#[test]
fn absent_current_version_starts_at_zero_and_target_defaults_to_highest() {
    let defs = vec![def(0, 1), def(1, 2), def(2, 5), def(1, 5)];
    let path = resolve(&defs, None, None).expect("resolve");
    assert_eq!(spans(&path), vec![(0, 1), (1, 5)]);
}

#[test]
fn branches_that_miss_the_target_are_ignored() {
    // 1 -> 3 is a dead end when the target is 4 and nothing leaves 3.
    let defs = vec![def(0, 1), def(1, 3), def(1, 2), def(2, 4)];
    let path = resolve(&defs, Some(0), Some(4)).expect("resolve");
    assert_eq!(spans(&path), vec![(0, 1), (1, 2), (2, 4)]);
}

#[test]
fn current_beyond_every_step_needs_nothing() {
    let defs = vec![def(0, 1), def(1, 2)];
    assert!(resolve(&defs, Some(7), None).expect("resolve").is_empty());
}

#[test]
fn resolving_to_the_current_version_is_empty() {
    let defs = vec![def(0, 1), def(1, 2), def(2, 3)];
    for v in 0..=3 {
        assert!(resolve(&defs, Some(v), Some(v)).expect("resolve").is_empty());
    }
}

#[test]
fn resuming_mid_chain_skips_applied_steps() {
    let defs = vec![def(0, 1), def(1, 2), def(2, 3), def(0, 3)];
    let path = resolve(&defs, Some(1), None).expect("resolve");
    assert_eq!(spans(&path), vec![(1, 2), (2, 3)]);
}
