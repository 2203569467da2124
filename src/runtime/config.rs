use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    persist::{StoreResult, VersionStore, sqlite::SqliteVersionStore},
    types::CurrentVersionPolicy,
};

/// Runner settings. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// How the current version is read from the version log.
    pub current_version_policy: CurrentVersionPolicy,
    /// Capacity of the [`crate::runtime::events::MigrationEvent`] broadcast channel.
    pub event_capacity: usize,
    /// SQLite file holding the version log; `None` keeps it in memory.
    pub store_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            current_version_policy: CurrentVersionPolicy::LastStarted,
            event_capacity: 256,
            store_path: None,
        }
    }
}

impl RunnerConfig {
    /// Parses a JSON document such as `{"current_version_policy": "last_completed"}`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Opens the SQLite version log named by [`Self::store_path`].
    pub fn open_store(&self) -> StoreResult<Box<dyn VersionStore>> {
        let store = match &self.store_path {
            Some(path) => SqliteVersionStore::open(path)?,
            None => SqliteVersionStore::open_in_memory()?,
        };
        Ok(Box::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = RunnerConfig::from_json_str(r#"{"current_version_policy":"last_completed"}"#).expect("parse");
        assert_eq!(cfg.current_version_policy, CurrentVersionPolicy::LastCompleted);
        assert_eq!(cfg.event_capacity, 256);
        assert!(cfg.store_path.is_none());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(RunnerConfig::from_json_str(r#"{"current_version_policy":"newest"}"#).is_err());
    }
}
