use std::collections::{BTreeMap, BTreeSet, VecDeque};

use proptest::prelude::*;

use schemaflow::{
    core::graph::resolve,
    migration::MigrationEdge,
    types::Version,
};

fn edges_strategy() -> impl Strategy<Value = Vec<(Version, Version)>> {
    prop::collection::vec((0u64..6, 1u64..4), 0..14)
        .prop_map(|raw| raw.into_iter().map(|(down, span)| (down, down + span)).collect())
}

/// Minimal hop count from `current` to `target` using only edges kept by the filter.
fn bfs_hops(edges: &[(Version, Version)], current: Version, target: Version) -> Option<usize> {
    let mut adjacency: BTreeMap<Version, BTreeSet<Version>> = BTreeMap::new();
    for &(down, up) in edges {
        if down >= current && up <= target {
            adjacency.entry(down).or_default().insert(up);
        }
    }

    let mut seen = BTreeSet::from([current]);
    let mut queue = VecDeque::from([(current, 0usize)]);
    while let Some((version, hops)) = queue.pop_front() {
        if version == target {
            return Some(hops);
        }
        for &next in adjacency.get(&version).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back((next, hops + 1));
            }
        }
    }
    None
}

proptest! {
    #[test]
    fn resolved_paths_are_contiguous_and_minimal(
        edges in edges_strategy(),
        current in 0u64..5,
        target in 0u64..9,
    ) {
        let has_candidates = edges.iter().any(|&(d, u)| d >= current && u <= target);
        let result = resolve(&edges, Some(current), Some(target));

        if current == target || !has_candidates {
            prop_assert!(result.expect("no-op resolve").is_empty());
            return Ok(());
        }

        match bfs_hops(&edges, current, target) {
            Some(hops) => {
                let path = result.expect("reachable target must resolve");
                prop_assert_eq!(path.len(), hops);
                prop_assert_eq!(path[0].down_version(), current);
                prop_assert_eq!(path[path.len() - 1].up_version(), target);
                for pair in path.windows(2) {
                    prop_assert_eq!(pair[0].up_version(), pair[1].down_version());
                }
            }
            None => {
                prop_assert!(result.is_err(), "unreachable target returned {:?}", result);
            }
        }
    }

    #[test]
    fn default_target_is_the_highest_up_version(edges in edges_strategy()) {
        let Some(highest) = edges.iter().map(|&(_, up)| up).max() else {
            return Ok(());
        };
        let by_default = resolve(&edges, Some(0), None).map(|p| p.len());
        let explicit = resolve(&edges, Some(0), Some(highest)).map(|p| p.len());
        prop_assert_eq!(by_default, explicit);
    }
}
