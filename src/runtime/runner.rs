use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    core::{
        catalog::{Catalog, CatalogError},
        graph::{self, GraphError},
    },
    migration::{MigrationDefinition, MigrationEdge, StepError},
    persist::{StoreError, StoreResult, VersionRecord, VersionState, VersionStore},
    types::Version,
};

use super::{config::RunnerConfig, events::MigrationEvent, signal::CompletionSignal};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("invalid migrations for {namespace}: {source}")]
    Configuration {
        namespace: String,
        #[source]
        source: CatalogError,
    },
    #[error("cannot migrate {namespace}: {source}")]
    Graph {
        namespace: String,
        #[source]
        source: GraphError,
    },
    #[error("migration {namespace} {down_version} -> {up_version} failed: {source}")]
    StepFailed {
        namespace: String,
        down_version: Version,
        up_version: Version,
        description: Option<String>,
        #[source]
        source: StepError,
    },
    #[error("version store failed for {namespace}: {source}")]
    Store {
        namespace: String,
        #[source]
        source: StoreError,
    },
    #[error("migration of {namespace} cancelled at version {version}")]
    Cancelled { namespace: String, version: Version },
    #[error("migration task for {namespace} aborted: {reason}")]
    TaskAborted { namespace: String, reason: String },
}

impl MigrationError {
    pub fn namespace(&self) -> &str {
        match self {
            Self::Configuration { namespace, .. }
            | Self::Graph { namespace, .. }
            | Self::StepFailed { namespace, .. }
            | Self::Store { namespace, .. }
            | Self::Cancelled { namespace, .. }
            | Self::TaskAborted { namespace, .. } => namespace,
        }
    }
}

/// A step that ran to completion during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    pub down_version: Version,
    pub up_version: Version,
    pub description: Option<String>,
}

impl<Db: Sync + ?Sized> From<&MigrationDefinition<Db>> for AppliedStep {
    fn from(def: &MigrationDefinition<Db>) -> Self {
        Self {
            down_version: def.down_version(),
            up_version: def.up_version(),
            description: def.description().map(str::to_string),
        }
    }
}

/// Result of migrating one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceOutcome {
    pub namespace: String,
    pub from_version: Version,
    pub to_version: Version,
    pub applied: Vec<AppliedStep>,
}

/// Per-namespace results of a full run, in catalog order.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<(String, Result<NamespaceOutcome, MigrationError>)>,
}

impl RunReport {
    pub fn outcome(&self, namespace: &str) -> Option<&Result<NamespaceOutcome, MigrationError>> {
        self.outcomes
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, result)| result)
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, result)| result.is_ok())
    }

    pub fn completed(&self) -> impl Iterator<Item = &NamespaceOutcome> {
        self.outcomes.iter().filter_map(|(_, result)| result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &MigrationError> {
        self.outcomes.iter().filter_map(|(_, result)| result.as_ref().err())
    }

    pub fn into_outcomes(self) -> Vec<(String, Result<NamespaceOutcome, MigrationError>)> {
        self.outcomes
    }
}

type SharedStore = Arc<Mutex<Box<dyn VersionStore>>>;

/// Brings every namespace of a [`Catalog`] to its latest version.
///
/// Each namespace runs as its own task; steps inside a namespace run one after
/// another, each fully recorded before the next starts. A namespace that
/// fails never publishes to the [`CompletionSignal`] and does not affect the
/// others.
pub struct MigrationRunner<Db: Send + Sync + 'static> {
    catalog: Arc<Catalog<Db>>,
    db: Arc<Db>,
    store: SharedStore,
    signal: CompletionSignal,
    clock: Arc<dyn Clock>,
    config: RunnerConfig,
    events_tx: broadcast::Sender<MigrationEvent>,
}

impl<Db: Send + Sync + 'static> Clone for MigrationRunner<Db> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            db: Arc::clone(&self.db),
            store: Arc::clone(&self.store),
            signal: self.signal.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

impl<Db: Send + Sync + 'static> MigrationRunner<Db> {
    pub fn new(catalog: Catalog<Db>, db: Arc<Db>, store: impl VersionStore + 'static, config: RunnerConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            catalog: Arc::new(catalog),
            db,
            store: Arc::new(Mutex::new(Box::new(store))),
            signal: CompletionSignal::new(),
            clock: Arc::new(SystemClock),
            config,
            events_tx,
        }
    }

    /// Publishes into an existing signal shared with dependent components.
    pub fn with_signal(mut self, signal: CompletionSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    pub fn catalog(&self) -> &Catalog<Db> {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MigrationEvent> {
        self.events_tx.subscribe()
    }

    pub(crate) fn events_sender(&self) -> broadcast::Sender<MigrationEvent> {
        self.events_tx.clone()
    }

    /// Migrates every namespace concurrently and waits for all of them.
    pub async fn run(&self) -> RunReport {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_with_cancel(cancel_rx).await
    }

    /// Like [`Self::run`], stopping each namespace before its next step once
    /// `cancel` turns true. In-flight steps are never interrupted.
    pub async fn run_with_cancel(&self, cancel: watch::Receiver<bool>) -> RunReport {
        let namespaces = self.catalog.namespaces().to_vec();
        info!(
            namespaces = namespaces.len(),
            migrations = self.catalog.len(),
            "determining available migrations"
        );

        let mut tasks = Vec::with_capacity(namespaces.len());
        for namespace in namespaces {
            let runner = self.clone();
            let cancel = cancel.clone();
            let task_namespace = namespace.clone();
            let task = tokio::spawn(async move { runner.migrate_until(&task_namespace, None, &cancel).await });
            tasks.push((namespace, task));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (namespace, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(err) => {
                    let err = MigrationError::TaskAborted {
                        namespace: namespace.clone(),
                        reason: err.to_string(),
                    };
                    self.report_failure(&err);
                    Err(err)
                }
            };
            outcomes.push((namespace, result));
        }

        RunReport { outcomes }
    }

    /// Migrates one namespace to `target`, or to its latest version when `None`,
    /// and publishes the result.
    pub async fn migrate_namespace(&self, namespace: &str, target: Option<Version>) -> Result<NamespaceOutcome, MigrationError> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.migrate_until(namespace, target, &cancel_rx).await
    }

    /// Runs `definition`'s reverse body. The version log is left untouched.
    pub async fn revert_step(&self, definition: &MigrationDefinition<Db>) -> Result<(), MigrationError> {
        warn!(
            namespace = definition.namespace(),
            down_version = definition.down_version(),
            up_version = definition.up_version(),
            description = definition.description().unwrap_or_default(),
            "reverting migration step"
        );
        definition
            .revert(&self.db)
            .await
            .map_err(|source| step_failed(definition, source))
    }

    pub async fn state(&self, namespace: &str) -> Result<VersionState, MigrationError> {
        let ns = namespace.to_string();
        self.with_store(namespace, move |store| store.state(&ns)).await
    }

    pub async fn records(&self, namespace: &str) -> Result<Vec<VersionRecord>, MigrationError> {
        let ns = namespace.to_string();
        self.with_store(namespace, move |store| store.records(&ns)).await
    }

    async fn migrate_until(
        &self,
        namespace: &str,
        target: Option<Version>,
        cancel: &watch::Receiver<bool>,
    ) -> Result<NamespaceOutcome, MigrationError> {
        let result = self.migrate_inner(namespace, target, cancel).await;
        match &result {
            Ok(outcome) => {
                self.signal.publish(namespace, outcome.to_version);
                let _ = self.events_tx.send(MigrationEvent::NamespaceCompleted {
                    namespace: namespace.to_string(),
                    version: outcome.to_version,
                });
                info!(
                    namespace,
                    version = outcome.to_version,
                    steps = outcome.applied.len(),
                    "completed migration"
                );
            }
            Err(err) => self.report_failure(err),
        }
        result
    }

    async fn migrate_inner(
        &self,
        namespace: &str,
        target: Option<Version>,
        cancel: &watch::Receiver<bool>,
    ) -> Result<NamespaceOutcome, MigrationError> {
        if let Some(err) = self.catalog.rejection(namespace) {
            return Err(MigrationError::Configuration {
                namespace: namespace.to_string(),
                source: err.clone(),
            });
        }

        let definitions = self.catalog.definitions(namespace);
        if let Some((lowest, highest)) = self.catalog.bounds(namespace) {
            info!(
                namespace,
                migrations = definitions.len(),
                lowest,
                highest,
                "found locally available migrations"
            );
        }

        let state = self.state(namespace).await?;
        let current = state.current_version(self.config.current_version_policy);
        info!(
            namespace,
            applied = state.count,
            current,
            first = ?state.first.as_ref().map(|r| r.version),
            most_recent = ?state.most_recent.as_ref().map(|r| r.version),
            "determined migration state"
        );
        if state.has_orphan() {
            warn!(
                namespace,
                version = ?state.most_recent.as_ref().map(|r| r.version),
                policy = ?self.config.current_version_policy,
                "version log ends with an uncompleted step"
            );
        }

        let path = graph::resolve(definitions, Some(current), target).map_err(|source| MigrationError::Graph {
            namespace: namespace.to_string(),
            source,
        })?;

        if path.is_empty() {
            debug!(namespace, current, "no migrations required");
            return Ok(NamespaceOutcome {
                namespace: namespace.to_string(),
                from_version: current,
                to_version: current,
                applied: Vec::new(),
            });
        }

        info!(
            namespace,
            steps = path.len(),
            path = %graph::format_path(&path),
            "migrating"
        );

        let mut reached = current;
        let mut applied = Vec::with_capacity(path.len());
        for definition in path {
            let cancelled = *cancel.borrow();
            if cancelled {
                return Err(MigrationError::Cancelled {
                    namespace: namespace.to_string(),
                    version: reached,
                });
            }
            self.apply_step(namespace, definition).await?;
            reached = definition.up_version();
            applied.push(AppliedStep::from(definition));
        }

        Ok(NamespaceOutcome {
            namespace: namespace.to_string(),
            from_version: current,
            to_version: reached,
            applied,
        })
    }

    async fn apply_step(&self, namespace: &str, definition: &MigrationDefinition<Db>) -> Result<(), MigrationError> {
        let down_version = definition.down_version();
        let up_version = definition.up_version();
        debug!(
            namespace,
            down_version,
            up_version,
            description = definition.description().unwrap_or_default(),
            "beginning migration step"
        );

        let started_at_ms = self.clock.now_ms();
        let ns = namespace.to_string();
        self.with_store(namespace, move |store| store.begin_step(&ns, up_version, started_at_ms))
            .await?;
        let _ = self.events_tx.send(MigrationEvent::StepStarted {
            namespace: namespace.to_string(),
            down_version,
            up_version,
        });

        definition
            .apply(&self.db)
            .await
            .map_err(|source| step_failed(definition, source))?;

        let completed_at_ms = self.clock.now_ms();
        let ns = namespace.to_string();
        self.with_store(namespace, move |store| store.complete_step(&ns, up_version, completed_at_ms))
            .await?;
        let _ = self.events_tx.send(MigrationEvent::StepCompleted {
            namespace: namespace.to_string(),
            down_version,
            up_version,
        });

        debug!(namespace, down_version, up_version, "completed migration step");
        Ok(())
    }

    async fn with_store<T, F>(&self, namespace: &str, op: F) -> Result<T, MigrationError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Box<dyn VersionStore>) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let joined = tokio::task::spawn_blocking(move || {
            let mut store = store.blocking_lock();
            op(&mut *store)
        })
        .await;

        let result = match joined {
            Ok(inner) => inner,
            Err(e) => Err(StoreError::Unavailable(format!("join error: {e}"))),
        };
        result.map_err(|source| MigrationError::Store {
            namespace: namespace.to_string(),
            source,
        })
    }

    fn report_failure(&self, err: &MigrationError) {
        match err {
            MigrationError::StepFailed {
                namespace,
                down_version,
                up_version,
                description,
                source,
            } => error!(
                namespace = namespace.as_str(),
                down_version = *down_version,
                up_version = *up_version,
                description = description.as_deref().unwrap_or_default(),
                error = %source,
                "migration step failed"
            ),
            other => error!(namespace = other.namespace(), error = %other, "migration failed"),
        }
        let _ = self.events_tx.send(MigrationEvent::NamespaceFailed {
            namespace: err.namespace().to_string(),
            reason: err.to_string(),
        });
    }
}

fn step_failed<Db: Sync + ?Sized>(definition: &MigrationDefinition<Db>, source: StepError) -> MigrationError {
    MigrationError::StepFailed {
        namespace: definition.namespace().to_string(),
        down_version: definition.down_version(),
        up_version: definition.up_version(),
        description: definition.description().map(str::to_string),
        source,
    }
}
