//! Application bootstrap: collect declarations, resolve the root modules, and
//! only hand back a running [`Application`] when every root resolved.

use std::collections::BTreeMap;
use std::sync::Arc;

use modgraph_core::ModuleName;

use crate::composer::{Aggregate, Composer, SharedComposer};
use crate::error::{ModGraphError, Result};
use crate::registry::{ManifestStore, ModuleDeclaration, RegistrationPolicy};
use crate::schema::RootConfig;

/// Builder for the module graph of an application
pub struct Bootstrap {
    composer: Composer,
    roots: Vec<ModuleName>,
}

impl Bootstrap {
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self { composer: Composer::new(policy), roots: Vec::new() }
    }

    /// Starts from the policy and roots of a root configuration
    pub fn from_config(config: &RootConfig) -> Self {
        Self { composer: Composer::new(config.global.policy), roots: config.roots.clone() }
    }

    /// Registers a declaration
    pub fn declare(mut self, decl: ModuleDeclaration) -> Result<Self> {
        self.composer.register(decl)?;
        Ok(self)
    }

    /// Registers several declarations in order
    pub fn declare_all(mut self, decls: impl IntoIterator<Item = ModuleDeclaration>) -> Result<Self> {
        for decl in decls {
            self.composer.register(decl)?;
        }
        Ok(self)
    }

    /// Registers every manifest in the store
    pub fn manifests(mut self, store: &ManifestStore) -> Result<Self> {
        self.composer.registry_mut().register_manifests(store)?;
        Ok(self)
    }

    /// Adds a top-level module to resolve at start
    pub fn root(mut self, name: ModuleName) -> Self {
        if !self.roots.contains(&name) {
            self.roots.push(name);
        }
        self
    }

    pub fn roots(&self) -> &[ModuleName] {
        &self.roots
    }

    /// Resolves every root; any failure aborts the start
    pub fn start(mut self) -> Result<Application> {
        if self.roots.is_empty() {
            return Err(ModGraphError::Bootstrap("No root modules configured".to_string()));
        }

        tracing::info!(
            "Bootstrapping {} root modules from {} declarations",
            self.roots.len(),
            self.composer.registry().len()
        );

        let mut aggregates = BTreeMap::new();
        for root in &self.roots {
            let aggregate = self.composer.resolve(root).map_err(|err| {
                tracing::error!("Failed to resolve root module '{}': {}", root, err);
                ModGraphError::Composer(err)
            })?;
            aggregates.insert(root.clone(), aggregate);
        }

        tracing::info!("Application started");
        Ok(Application { composer: SharedComposer::new(self.composer), aggregates })
    }
}

/// A started application: every root module resolved
pub struct Application {
    composer: SharedComposer,
    aggregates: BTreeMap<ModuleName, Arc<Aggregate>>,
}

impl Application {
    /// The aggregate of a root module
    pub fn aggregate(&self, root: &str) -> Option<Arc<Aggregate>> {
        self.aggregates.get(root).cloned()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ModuleName> + '_ {
        self.aggregates.keys()
    }

    /// Handle for resolving further modules after start
    pub fn composer(&self) -> &SharedComposer {
        &self.composer
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ComposerError;
    use crate::registry::Initializer;

    fn decl(name: &str, deps: &[&str]) -> ModuleDeclaration {
        ModuleDeclaration::parse(name, deps).unwrap()
    }

    #[test]
    fn test_start_resolves_roots() {
        let app = Bootstrap::new(RegistrationPolicy::Strict)
            .declare_all([decl("services", &["storage", "menu"]), decl("storage", &[]), decl("menu", &[])])
            .unwrap()
            .root(ModuleName::from_static("services"))
            .start()
            .unwrap();

        let services = app.aggregate("services").unwrap();
        assert_eq!(services.len(), 3);
        assert_eq!(app.roots().count(), 1);

        // Later lookups go through the shared handle and hit the cache
        let again = app.composer().resolve(&ModuleName::from_static("services")).unwrap();
        assert!(Arc::ptr_eq(&services, &again));
    }

    #[test]
    fn test_start_fails_without_roots() {
        let result = Bootstrap::new(RegistrationPolicy::Strict).start();
        assert!(matches!(result, Err(ModGraphError::Bootstrap(_))));
    }

    #[test]
    fn test_failed_root_prevents_start() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = Bootstrap::new(RegistrationPolicy::Strict)
            .declare(decl("storage", &[]).with_initializer(Initializer::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })))
            .unwrap()
            .declare(decl("services", &["storage", "server"]))
            .unwrap()
            .root(ModuleName::from_static("services"))
            .start();

        assert!(matches!(
            result,
            Err(ModGraphError::Composer(ComposerError::UnknownModule { .. }))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_declaration_in_strict_mode() {
        let result = Bootstrap::new(RegistrationPolicy::Strict)
            .declare(decl("menu", &[]))
            .and_then(|b| b.declare(decl("menu", &["storage"])));
        assert!(matches!(result, Err(ModGraphError::Composer(ComposerError::Registry(_)))));
    }
}
