//! Registration catalog and path resolution.

/// Immutable catalog of registered migration definitions.
pub mod catalog;
/// Fewest-hop migration path resolver.
pub mod graph;
