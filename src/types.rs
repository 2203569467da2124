//! Shared primitive IDs and completion payloads.

use serde::{Deserialize, Serialize};

/// Schema version of a namespace. Absence of any record means version `0`.
pub type Version = u64;
/// Row identifier in the version log.
pub type RecordId = u64;
/// Millisecond wall-clock timestamp.
pub type TimestampMs = u64;

/// Published once a namespace has reached a consistent version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MigrationCompleted {
    /// Namespace alias the migration ran for.
    pub namespace: String,
    /// Version the namespace is now at.
    pub version: Version,
}

/// Which version-log entry determines a namespace's current version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentVersionPolicy {
    /// Most recently inserted record, completed or not.
    ///
    /// Compatible with existing version logs. An orphaned record left by an
    /// interrupted step counts as reached and is not retried.
    #[default]
    LastStarted,
    /// Most recently inserted record that has a completion timestamp.
    ///
    /// An interrupted step is attempted again on the next run.
    LastCompleted,
}
