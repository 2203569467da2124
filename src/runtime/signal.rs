//! Process-wide "namespace is migrated" notification.
//!
//! Each namespace owns a `watch` channel carrying a [`CompletionState`]. The
//! channel value is the cache: a waiter that subscribes after a publish sees
//! `Completed` immediately, and a waiter that subscribes before it is woken by
//! the publish. Publishing again overwrites the value, so late waiters always
//! observe the latest version and never a stale one.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use hashbrown::HashMap;
use tokio::sync::watch;

use crate::types::{MigrationCompleted, Version};

/// Migration state of one namespace as seen by dependents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionState {
    /// No successful migration has been published yet.
    #[default]
    Pending,
    /// The namespace is consistent at this version.
    Completed(Version),
}

impl CompletionState {
    /// Published version, if any.
    pub fn version(self) -> Option<Version> {
        match self {
            Self::Pending => None,
            Self::Completed(version) => Some(version),
        }
    }

    /// True once a version has been published.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Shared completion broadcaster. Clones refer to the same state.
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    channels: Arc<Mutex<HashMap<String, watch::Sender<CompletionState>>>>,
}

impl CompletionSignal {
    /// Creates a signal with every namespace pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `namespace` is now at `version` and wakes all its waiters.
    pub fn publish(&self, namespace: &str, version: Version) {
        let mut channels = self.lock();
        let tx = channels
            .entry(namespace.to_string())
            .or_insert_with(|| watch::channel(CompletionState::Pending).0);
        tx.send_replace(CompletionState::Completed(version));
        tracing::debug!(namespace, version, "published migration completion");
    }

    /// Waits until `namespace` has a published version and returns the latest one.
    ///
    /// Never resolves for a namespace whose migration failed; callers that
    /// cannot block indefinitely should use [`Self::wait_timeout`].
    pub async fn wait(&self, namespace: &str) -> MigrationCompleted {
        let mut rx = self.subscribe(namespace);
        let version = match rx.wait_for(CompletionState::is_completed).await {
            Ok(state) => state.version(),
            Err(_) => None,
        };
        match version {
            Some(version) => MigrationCompleted {
                namespace: namespace.to_string(),
                version,
            },
            // The sender lives in `channels` as long as `self` does.
            None => std::future::pending().await,
        }
    }

    /// Like [`Self::wait`], giving up after `timeout`.
    pub async fn wait_timeout(&self, namespace: &str, timeout: Duration) -> Option<MigrationCompleted> {
        tokio::time::timeout(timeout, self.wait(namespace)).await.ok()
    }

    /// Latest published completion, without waiting.
    pub fn try_get(&self, namespace: &str) -> Option<MigrationCompleted> {
        let version = self.state(namespace).version()?;
        Some(MigrationCompleted {
            namespace: namespace.to_string(),
            version,
        })
    }

    /// Current state of `namespace`.
    pub fn state(&self, namespace: &str) -> CompletionState {
        self.lock()
            .get(namespace)
            .map(|tx| *tx.borrow())
            .unwrap_or_default()
    }

    /// Every namespace that has completed, in no particular order.
    pub fn completed(&self) -> Vec<MigrationCompleted> {
        self.lock()
            .iter()
            .filter_map(|(namespace, tx)| {
                tx.borrow().version().map(|version| MigrationCompleted {
                    namespace: namespace.clone(),
                    version,
                })
            })
            .collect()
    }

    /// Change stream for `namespace`, starting from its current state.
    pub fn subscribe(&self, namespace: &str) -> watch::Receiver<CompletionState> {
        let mut channels = self.lock();
        channels
            .entry(namespace.to_string())
            .or_insert_with(|| watch::channel(CompletionState::Pending).0)
            .subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<CompletionState>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_namespace_is_pending() {
        let signal = CompletionSignal::new();
        assert_eq!(signal.state("PoeDb"), CompletionState::Pending);
        assert!(signal.try_get("PoeDb").is_none());
        assert!(signal.completed().is_empty());
    }

    #[test]
    fn publish_overwrites_previous_version() {
        let signal = CompletionSignal::new();
        signal.publish("PoeDb", 1);
        signal.publish("PoeDb", 3);
        assert_eq!(signal.state("PoeDb"), CompletionState::Completed(3));
        assert_eq!(signal.try_get("PoeDb").map(|c| c.version), Some(3));
        assert_eq!(signal.completed().len(), 1);
    }
}
