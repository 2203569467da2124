//! Async migration runner, completion signal and hosting handle.

/// Runner settings.
pub mod config;
/// Event stream types emitted by the runner.
pub mod events;
/// Background hosting of a run.
pub mod handle;
/// Per-namespace orchestration.
pub mod runner;
/// Completion broadcaster for dependent components.
pub mod signal;
