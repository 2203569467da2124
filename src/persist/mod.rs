pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CurrentVersionPolicy, RecordId, TimestampMs, Version};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("no open version record for {namespace} at version {version}")]
    NoOpenRecord { namespace: String, version: Version },
    #[error("version store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One attempt to bring a namespace to `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: RecordId,
    pub namespace: String,
    pub version: Version,
    pub started_at_ms: TimestampMs,
    pub completed_at_ms: Option<TimestampMs>,
}

impl VersionRecord {
    /// Started but never completed, typically after a crash or a failed step.
    pub fn is_orphaned(&self) -> bool {
        self.completed_at_ms.is_none()
    }
}

/// Summary of a namespace's version log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionState {
    pub count: u64,
    pub first: Option<VersionRecord>,
    pub most_recent: Option<VersionRecord>,
    pub latest_completed: Option<VersionRecord>,
}

impl VersionState {
    pub fn current_version(&self, policy: CurrentVersionPolicy) -> Version {
        let record = match policy {
            CurrentVersionPolicy::LastStarted => self.most_recent.as_ref(),
            CurrentVersionPolicy::LastCompleted => self.latest_completed.as_ref(),
        };
        record.map(|r| r.version).unwrap_or(0)
    }

    pub fn has_orphan(&self) -> bool {
        self.most_recent.as_ref().is_some_and(VersionRecord::is_orphaned)
    }
}

/// Append-only log of migration attempts, keyed by namespace.
///
/// Calls are synchronous; the runner drives them from blocking tasks.
pub trait VersionStore: Send {
    fn state(&self, namespace: &str) -> StoreResult<VersionState>;
    /// Appends an open record and returns its id.
    fn begin_step(&mut self, namespace: &str, version: Version, started_at_ms: TimestampMs) -> StoreResult<RecordId>;
    /// Stamps the newest open record for `(namespace, version)`.
    fn complete_step(&mut self, namespace: &str, version: Version, completed_at_ms: TimestampMs) -> StoreResult<()>;
    /// All records for `namespace`, oldest first.
    fn records(&self, namespace: &str) -> StoreResult<Vec<VersionRecord>>;
    fn flush(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

impl VersionStore for Box<dyn VersionStore> {
    fn state(&self, namespace: &str) -> StoreResult<VersionState> {
        (**self).state(namespace)
    }

    fn begin_step(&mut self, namespace: &str, version: Version, started_at_ms: TimestampMs) -> StoreResult<RecordId> {
        (**self).begin_step(namespace, version, started_at_ms)
    }

    fn complete_step(&mut self, namespace: &str, version: Version, completed_at_ms: TimestampMs) -> StoreResult<()> {
        (**self).complete_step(namespace, version, completed_at_ms)
    }

    fn records(&self, namespace: &str) -> StoreResult<Vec<VersionRecord>> {
        (**self).records(namespace)
    }

    fn flush(&mut self) -> StoreResult<()> {
        (**self).flush()
    }
}

/// Builds a [`VersionState`] from records already in insertion order.
pub(crate) fn summarize(records: &[VersionRecord]) -> VersionState {
    VersionState {
        count: records.len() as u64,
        first: records.first().cloned(),
        most_recent: records.last().cloned(),
        latest_completed: records.iter().rev().find(|r| !r.is_orphaned()).cloned(),
    }
}
