//! Fewest-hop path resolution over a namespace's migration steps.
//!
//! Every step is a node; node `A` has an edge to node `B` when
//! `A.up_version == B.down_version`. A virtual source reaches every node whose
//! down version equals the current version. Dijkstra with unit weights then
//! yields the shortest application order, so a single combined step spanning
//! several versions always wins over a chain of smaller steps.

use std::{cmp::Reverse, collections::BinaryHeap};

use hashbrown::HashMap;
use thiserror::Error;

use crate::{migration::MigrationEdge, types::Version};

/// Failure to find an application order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// No available step starts at the current version, or none was reachable.
    #[error("no path from the current version ({current}) exists with the available migrations")]
    NoPathFromCurrent {
        /// Version the namespace is at.
        current: Version,
        /// Requested target.
        target: Version,
    },
    /// Steps start at the current version, but none of them lead to the target.
    #[error("no path to the target version ({target}) exists with the available migrations")]
    NoPathToTarget {
        /// Version the namespace is at.
        current: Version,
        /// Requested target.
        target: Version,
    },
    /// Path reconstruction ended somewhere other than the current version.
    #[error("no path between the current version ({current}) and the intermediary version ({reached}) exists")]
    BrokenTrace {
        /// Version the namespace is at.
        current: Version,
        /// Down version where the backward walk stopped.
        reached: Version,
    },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    distance: usize,
    visited: bool,
    previous: Option<usize>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            distance: usize::MAX,
            visited: false,
            previous: None,
        }
    }
}

/// Resolves the fewest-hop sequence of steps from `current` to `target`.
///
/// `current` defaults to `0`; `target` defaults to the highest up version
/// among `edges`. Steps with `down < current` or `up > target` are ignored.
/// Returns an empty sequence when nothing remains after filtering or when
/// `current == target`.
pub fn resolve<'a, E, I>(
    edges: I,
    current: Option<Version>,
    target: Option<Version>,
) -> Result<Vec<&'a E>, GraphError>
where
    E: MigrationEdge + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let all: Vec<&'a E> = edges.into_iter().collect();
    let current = current.unwrap_or(0);
    let Some(target) = target.or_else(|| all.iter().map(|e| e.up_version()).max()) else {
        return Ok(Vec::new());
    };

    if current == target {
        return Ok(Vec::new());
    }

    let candidates: Vec<&'a E> = all
        .into_iter()
        .filter(|e| e.down_version() >= current && e.up_version() <= target)
        .collect();
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_down: HashMap<Version, Vec<usize>> = HashMap::new();
    for (idx, edge) in candidates.iter().enumerate() {
        by_down.entry(edge.down_version()).or_default().push(idx);
    }

    let nodes = trace_distances(&candidates, &by_down, current);

    let left_current = candidates
        .iter()
        .zip(&nodes)
        .any(|(edge, node)| edge.down_version() == current && node.visited);
    if !left_current {
        return Err(GraphError::NoPathFromCurrent { current, target });
    }

    let closest = candidates
        .iter()
        .zip(&nodes)
        .enumerate()
        .filter(|(_, (edge, node))| node.visited && edge.up_version() == target)
        .min_by_key(|(_, (_, node))| node.distance)
        .map(|(idx, _)| idx);
    let Some(mut cursor) = closest else {
        return Err(GraphError::NoPathToTarget { current, target });
    };

    let mut trace = Vec::with_capacity(nodes[cursor].distance.saturating_add(1));
    loop {
        let edge = candidates[cursor];
        trace.push(edge);
        match nodes[cursor].previous {
            Some(prev) => cursor = prev,
            None => {
                if edge.down_version() != current {
                    return Err(GraphError::BrokenTrace {
                        current,
                        reached: edge.down_version(),
                    });
                }
                break;
            }
        }
    }

    trace.reverse();
    Ok(trace)
}

fn trace_distances<E: MigrationEdge>(
    candidates: &[&E],
    by_down: &HashMap<Version, Vec<usize>>,
    start: Version,
) -> Vec<Node> {
    let mut nodes = vec![Node::default(); candidates.len()];
    let mut queue = BinaryHeap::with_capacity(candidates.len());

    if let Some(roots) = by_down.get(&start) {
        for &idx in roots {
            nodes[idx].distance = 0;
            queue.push(Reverse((0usize, idx)));
        }
    }

    while let Some(Reverse((distance, idx))) = queue.pop() {
        if nodes[idx].visited {
            continue;
        }
        nodes[idx].visited = true;

        let next_distance = distance + 1;
        let Some(successors) = by_down.get(&candidates[idx].up_version()) else {
            continue;
        };
        for &next in successors {
            let node = &mut nodes[next];
            if node.distance <= next_distance {
                continue;
            }
            node.distance = next_distance;
            node.previous = Some(idx);
            if !node.visited {
                queue.push(Reverse((next_distance, next)));
            }
        }
    }

    nodes
}

/// Renders a resolved path as `0 -> 1 -> 3` for log lines.
pub fn format_path<E: MigrationEdge>(path: &[&E]) -> String {
    let Some(first) = path.first() else {
        return String::new();
    };
    let mut out = first.down_version().to_string();
    for edge in path {
        out.push_str(" -> ");
        out.push_str(&edge.up_version().to_string());
    }
    out
}
