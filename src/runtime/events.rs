//! Runner event stream payloads.

use crate::types::Version;

/// Progress events emitted while namespaces migrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    /// A step's version record was written and its body is about to run.
    StepStarted {
        /// Namespace being migrated.
        namespace: String,
        /// Version the step starts from.
        down_version: Version,
        /// Version the step arrives at.
        up_version: Version,
    },
    /// A step's body returned and its record was stamped complete.
    StepCompleted {
        /// Namespace being migrated.
        namespace: String,
        /// Version the step started from.
        down_version: Version,
        /// Version the namespace is now at.
        up_version: Version,
    },
    /// The namespace reached its target and was published.
    NamespaceCompleted {
        /// Migrated namespace.
        namespace: String,
        /// Final version.
        version: Version,
    },
    /// The namespace stopped without publishing.
    NamespaceFailed {
        /// Namespace that failed.
        namespace: String,
        /// Rendered error.
        reason: String,
    },
}
