//! Migration step trait and immutable definitions.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::types::Version;

/// Error returned by a step's `up` or `down` body.
pub type StepError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A reversible transformation of one namespace's persisted state.
///
/// `Db` is whatever handle the step needs to reach the namespace's storage.
/// Steps may perform long-running I/O; the runner awaits them to completion
/// and never interrupts one mid-flight.
#[async_trait]
pub trait Migration<Db: Sync + ?Sized>: Send + Sync {
    /// Moves the namespace from the definition's down version to its up version.
    async fn up(&self, db: &Db) -> Result<(), StepError>;
    /// Moves the namespace back from the up version to the down version.
    async fn down(&self, db: &Db) -> Result<(), StepError>;
}

/// Directed edge between two versions, as seen by the path resolver.
pub trait MigrationEdge {
    /// Version the step starts from.
    fn down_version(&self) -> Version;
    /// Version the step arrives at.
    fn up_version(&self) -> Version;
}

impl MigrationEdge for (Version, Version) {
    fn down_version(&self) -> Version {
        self.0
    }

    fn up_version(&self) -> Version {
        self.1
    }
}

/// One registered step for a namespace.
pub struct MigrationDefinition<Db: Sync + ?Sized> {
    namespace: String,
    down_version: Version,
    up_version: Version,
    description: Option<String>,
    step: Arc<dyn Migration<Db>>,
}

impl<Db: Sync + ?Sized> MigrationDefinition<Db> {
    /// Creates a definition without a description.
    pub fn new(
        namespace: impl Into<String>,
        down_version: Version,
        up_version: Version,
        step: impl Migration<Db> + 'static,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            down_version,
            up_version,
            description: None,
            step: Arc::new(step),
        }
    }

    /// Attaches a human-readable description used in logs and reports.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Namespace alias this step belongs to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Optional description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Step body.
    pub fn step(&self) -> &dyn Migration<Db> {
        self.step.as_ref()
    }

    /// Runs the forward body against `db`.
    pub async fn apply(&self, db: &Db) -> Result<(), StepError> {
        self.step.up(db).await
    }

    /// Runs the reverse body against `db`.
    pub async fn revert(&self, db: &Db) -> Result<(), StepError> {
        self.step.down(db).await
    }
}

impl<Db: Sync + ?Sized> MigrationEdge for MigrationDefinition<Db> {
    fn down_version(&self) -> Version {
        self.down_version
    }

    fn up_version(&self) -> Version {
        self.up_version
    }
}

impl<Db: Sync + ?Sized> Clone for MigrationDefinition<Db> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            down_version: self.down_version,
            up_version: self.up_version,
            description: self.description.clone(),
            step: Arc::clone(&self.step),
        }
    }
}

impl<Db: Sync + ?Sized> fmt::Debug for MigrationDefinition<Db> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDefinition")
            .field("namespace", &self.namespace)
            .field("down_version", &self.down_version)
            .field("up_version", &self.up_version)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
