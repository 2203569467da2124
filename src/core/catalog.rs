use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use crate::{
    migration::{MigrationDefinition, MigrationEdge},
    types::Version,
};

/// Malformed migration definition, detected while building the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("migration namespace must not be empty")]
    EmptyNamespace,
    #[error("migration namespace {namespace:?} has surrounding whitespace")]
    UntrimmedNamespace { namespace: String },
    #[error("migration {namespace} {down_version} -> {up_version} does not move forward")]
    NotForward {
        namespace: String,
        down_version: Version,
        up_version: Version,
    },
    #[error("migration {namespace} {down_version} -> {up_version} is registered twice")]
    DuplicateStep {
        namespace: String,
        down_version: Version,
        up_version: Version,
    },
}

/// Collects definitions before freezing them into a [`Catalog`].
pub struct CatalogBuilder<Db: Sync + ?Sized> {
    definitions: Vec<MigrationDefinition<Db>>,
}

impl<Db: Sync + ?Sized> Default for CatalogBuilder<Db> {
    fn default() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }
}

impl<Db: Sync + ?Sized> CatalogBuilder<Db> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, definition: MigrationDefinition<Db>) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn register_all(mut self, definitions: impl IntoIterator<Item = MigrationDefinition<Db>>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Groups definitions by namespace and validates each group.
    ///
    /// A namespace with any malformed definition is kept out of the runnable
    /// set and recorded in [`Catalog::rejection`]; other namespaces are
    /// unaffected.
    pub fn build(self) -> Catalog<Db> {
        let mut catalog = Catalog {
            order: Vec::new(),
            by_namespace: HashMap::new(),
            rejected: HashMap::new(),
        };
        let mut seen_steps: HashSet<(String, Version, Version)> = HashSet::new();

        for def in self.definitions {
            let namespace = def.namespace().to_string();
            if !catalog.by_namespace.contains_key(&namespace) && !catalog.rejected.contains_key(&namespace) {
                catalog.order.push(namespace.clone());
                catalog.by_namespace.insert(namespace.clone(), Vec::new());
            }
            if catalog.rejected.contains_key(&namespace) {
                continue;
            }

            let key = (namespace.clone(), def.down_version(), def.up_version());
            let verdict = validate(&def).and_then(|()| {
                if seen_steps.insert(key) {
                    Ok(())
                } else {
                    Err(CatalogError::DuplicateStep {
                        namespace: namespace.clone(),
                        down_version: def.down_version(),
                        up_version: def.up_version(),
                    })
                }
            });

            match verdict {
                Ok(()) => {
                    if let Some(defs) = catalog.by_namespace.get_mut(&namespace) {
                        defs.push(def);
                    }
                }
                Err(err) => {
                    tracing::warn!(namespace = %namespace, error = %err, "rejecting migrations for namespace");
                    catalog.by_namespace.remove(&namespace);
                    catalog.rejected.insert(namespace, err);
                }
            }
        }

        catalog
    }
}

fn validate<Db: Sync + ?Sized>(def: &MigrationDefinition<Db>) -> Result<(), CatalogError> {
    let namespace = def.namespace();
    if namespace.is_empty() {
        return Err(CatalogError::EmptyNamespace);
    }
    if namespace.trim() != namespace {
        return Err(CatalogError::UntrimmedNamespace {
            namespace: namespace.to_string(),
        });
    }
    if def.up_version() <= def.down_version() {
        return Err(CatalogError::NotForward {
            namespace: namespace.to_string(),
            down_version: def.down_version(),
            up_version: def.up_version(),
        });
    }
    Ok(())
}

/// Immutable set of migration definitions, grouped by namespace.
pub struct Catalog<Db: Sync + ?Sized> {
    order: Vec<String>,
    by_namespace: HashMap<String, Vec<MigrationDefinition<Db>>>,
    rejected: HashMap<String, CatalogError>,
}

impl<Db: Sync + ?Sized> Catalog<Db> {
    pub fn builder() -> CatalogBuilder<Db> {
        CatalogBuilder::new()
    }

    /// Distinct namespaces in first-registration order, rejected ones included.
    pub fn namespaces(&self) -> &[String] {
        &self.order
    }

    /// Valid definitions for `namespace`, in registration order.
    pub fn definitions(&self, namespace: &str) -> &[MigrationDefinition<Db>] {
        self.by_namespace
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rejection(&self, namespace: &str) -> Option<&CatalogError> {
        self.rejected.get(namespace)
    }

    /// Fails with the first rejection, in namespace order.
    pub fn ensure_valid(&self) -> Result<(), CatalogError> {
        match self.order.iter().find_map(|ns| self.rejected.get(ns)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Lowest down version and highest up version registered for `namespace`.
    pub fn bounds(&self, namespace: &str) -> Option<(Version, Version)> {
        let defs = self.definitions(namespace);
        let lowest = defs.iter().map(MigrationEdge::down_version).min()?;
        let highest = defs.iter().map(MigrationEdge::up_version).max()?;
        Some((lowest, highest))
    }

    /// Highest up version registered for `namespace`, the default migration target.
    pub fn latest_version(&self, namespace: &str) -> Option<Version> {
        self.bounds(namespace).map(|(_, highest)| highest)
    }

    pub fn len(&self) -> usize {
        self.by_namespace.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::migration::{Migration, StepError};

    struct Noop;

    #[async_trait]
    impl Migration<()> for Noop {
        async fn up(&self, _db: &()) -> Result<(), StepError> {
            Ok(())
        }

        async fn down(&self, _db: &()) -> Result<(), StepError> {
            Ok(())
        }
    }

    fn def(ns: &str, down: Version, up: Version) -> MigrationDefinition<()> {
        MigrationDefinition::new(ns, down, up, Noop)
    }

    #[test]
    fn groups_by_namespace_in_registration_order() {
        let catalog = Catalog::builder()
            .register(def("PoeNinja", 0, 1))
            .register(def("PoeDb", 0, 1))
            .register(def("PoeNinja", 1, 2))
            .build();

        assert_eq!(catalog.namespaces(), ["PoeNinja".to_string(), "PoeDb".to_string()]);
        assert_eq!(catalog.definitions("PoeNinja").len(), 2);
        assert_eq!(catalog.bounds("PoeNinja"), Some((0, 2)));
        assert_eq!(catalog.latest_version("PoeDb"), Some(1));
        assert_eq!(catalog.len(), 3);
        assert!(catalog.ensure_valid().is_ok());
    }

    #[test]
    fn malformed_definition_rejects_only_its_namespace() {
        let catalog = Catalog::builder()
            .register(def("Leagues", 0, 1))
            .register(def("Leagues", 2, 2))
            .register(def("Skills", 0, 1))
            .build();

        assert!(catalog.definitions("Leagues").is_empty());
        assert!(matches!(
            catalog.rejection("Leagues"),
            Some(CatalogError::NotForward { down_version: 2, up_version: 2, .. })
        ));
        assert_eq!(catalog.definitions("Skills").len(), 1);
        assert!(catalog.ensure_valid().is_err());
        assert_eq!(catalog.namespaces().len(), 2);
    }

    #[test]
    fn duplicate_and_blank_namespaces_are_rejected() {
        let catalog = Catalog::builder()
            .register(def("Gems", 0, 1))
            .register(def("Gems", 0, 1))
            .register(def("", 0, 1))
            .register(def(" Gems", 0, 1))
            .build();

        assert!(matches!(catalog.rejection("Gems"), Some(CatalogError::DuplicateStep { .. })));
        assert_eq!(catalog.rejection(""), Some(&CatalogError::EmptyNamespace));
        assert!(matches!(
            catalog.rejection(" Gems"),
            Some(CatalogError::UntrimmedNamespace { .. })
        ));
        assert!(catalog.is_empty());
    }
}
