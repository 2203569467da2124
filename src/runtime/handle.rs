use thiserror::Error;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};

use super::{
    events::MigrationEvent,
    runner::{MigrationRunner, RunReport},
    signal::CompletionSignal,
};

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("migration task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a migration run hosted as a background task.
pub struct MigrationHandle {
    cancel_tx: watch::Sender<bool>,
    events_tx: broadcast::Sender<MigrationEvent>,
    signal: CompletionSignal,
    task: JoinHandle<RunReport>,
}

/// Starts `runner` in the background and returns immediately.
///
/// Dependents wait on [`MigrationHandle::signal`] while the run proceeds.
pub fn spawn_migrations<Db: Send + Sync + 'static>(runner: MigrationRunner<Db>) -> MigrationHandle {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let events_tx = runner.events_sender();
    let signal = runner.signal().clone();

    let task = tokio::spawn(async move { runner.run_with_cancel(cancel_rx).await });

    MigrationHandle {
        cancel_tx,
        events_tx,
        signal,
        task,
    }
}

impl MigrationHandle {
    /// Stops every namespace before its next step. Steps already running finish.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MigrationEvent> {
        self.events_tx.subscribe()
    }

    pub fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for every namespace task and returns their results.
    pub async fn join(self) -> Result<RunReport, HandleError> {
        Ok(self.task.await?)
    }
}
