//! Process-local version log, for tests and embedders without a database.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;

use crate::types::{RecordId, TimestampMs, Version};

use super::{StoreError, StoreResult, VersionRecord, VersionState, VersionStore, summarize};

#[derive(Debug, Default)]
struct Inner {
    by_namespace: HashMap<String, Vec<VersionRecord>>,
    next_id: RecordId,
    unavailable: bool,
}

/// In-memory [`VersionStore`]. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVersionStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryVersionStore {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`] while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Inserts a record verbatim, e.g. to reproduce a log left by an earlier process.
    pub fn seed(&self, namespace: &str, version: Version, started_at_ms: TimestampMs, completed_at_ms: Option<TimestampMs>) -> RecordId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .by_namespace
            .entry(namespace.to_string())
            .or_default()
            .push(VersionRecord {
                id,
                namespace: namespace.to_string(),
                version,
                started_at_ms,
                completed_at_ms,
            });
        id
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn available(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(inner)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn state(&self, namespace: &str) -> StoreResult<VersionState> {
        let inner = self.available()?;
        let records = inner.by_namespace.get(namespace).map(Vec::as_slice).unwrap_or(&[]);
        Ok(summarize(records))
    }

    fn begin_step(&mut self, namespace: &str, version: Version, started_at_ms: TimestampMs) -> StoreResult<RecordId> {
        drop(self.available()?);
        Ok(self.seed(namespace, version, started_at_ms, None))
    }

    fn complete_step(&mut self, namespace: &str, version: Version, completed_at_ms: TimestampMs) -> StoreResult<()> {
        let mut inner = self.available()?;
        let open = inner
            .by_namespace
            .get_mut(namespace)
            .and_then(|records| {
                records
                    .iter_mut()
                    .rev()
                    .find(|r| r.version == version && r.completed_at_ms.is_none())
            })
            .ok_or_else(|| StoreError::NoOpenRecord {
                namespace: namespace.to_string(),
                version,
            })?;
        open.completed_at_ms = Some(completed_at_ms);
        Ok(())
    }

    fn records(&self, namespace: &str) -> StoreResult<Vec<VersionRecord>> {
        let inner = self.available()?;
        Ok(inner.by_namespace.get(namespace).cloned().unwrap_or_default())
    }
}
