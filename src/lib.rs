//! Forward schema migrations for independently versioned namespaces.
//!
//! Migration steps are registered into an immutable [`core::catalog::Catalog`].
//! For each namespace the [`runtime::runner::MigrationRunner`] reads the
//! current version from a [`persist::VersionStore`], resolves the fewest-hop
//! path to the latest version with [`core::graph::resolve`], applies the steps
//! in order while recording each attempt, and finally publishes the reached
//! version on a [`runtime::signal::CompletionSignal`].
//!
//! # Examples
//!
//! Resolving a path over plain `(down, up)` edges:
//! ```
//! use schemaflow::core::graph::resolve;
//!
//! let edges: Vec<(u64, u64)> = vec![(0, 1), (1, 2), (0, 2)];
//! let path = resolve(&edges, Some(0), None).expect("resolve");
//! assert_eq!(path, vec![&(0u64, 2u64)]);
//! ```
//!
//! Running migrations and waiting for a namespace:
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use schemaflow::{
//!     core::catalog::Catalog,
//!     migration::{Migration, MigrationDefinition, StepError},
//!     persist::sqlite::SqliteVersionStore,
//!     runtime::{config::RunnerConfig, handle::spawn_migrations, runner::MigrationRunner},
//! };
//!
//! struct AddGemIndex;
//!
//! #[async_trait]
//! impl Migration<()> for AddGemIndex {
//!     async fn up(&self, _db: &()) -> Result<(), StepError> {
//!         Ok(())
//!     }
//!
//!     async fn down(&self, _db: &()) -> Result<(), StepError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let catalog = Catalog::builder()
//!     .register(MigrationDefinition::new("PoeNinja", 0, 1, AddGemIndex).with_description("add gem index"))
//!     .build();
//! let store = SqliteVersionStore::open("versions.db").expect("open sqlite");
//! let runner = MigrationRunner::new(catalog, Arc::new(()), store, RunnerConfig::default());
//! let handle = spawn_migrations(runner);
//! let done = handle.signal().wait("PoeNinja").await;
//! assert_eq!(done.version, 1);
//! handle.join().await.expect("join");
//! # }
//! ```
#![warn(missing_docs)]

/// Wall-clock abstraction for version-log timestamps.
pub mod clock;
/// Migration catalog and path resolution.
pub mod core;
/// Step trait and migration definitions.
pub mod migration;
/// Version-log abstraction and SQLite implementation.
pub mod persist;
/// Async runner, completion signal and events.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;
