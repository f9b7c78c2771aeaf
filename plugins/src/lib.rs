//! Module discovery plugins for modgraph

mod services;

use std::path::PathBuf;

use futures::future::join_all;
use modgraph::registry::ManifestStore;
use modgraph::{BoxError, ModGraphError, ModuleDeclaration, SharedComposer};
pub use services::{ServiceModule, ServicesFacade, SERVICES_FACADE};

/// Source of module declarations contributed by an external collaborator
#[async_trait::async_trait]
pub trait ModuleDiscovery: Send + Sync {
    /// Name of the source, used in errors and logs
    fn source(&self) -> &str;

    /// Discover the declarations this source provides
    async fn discover(&self) -> Result<Vec<ModuleDeclaration>, BoxError>;
}

/// Discovers declarations from manifest files in a directory
pub struct ManifestDiscovery {
    dir: PathBuf,
    source: String,
}

impl ManifestDiscovery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let source = format!("manifests:{}", dir.display());
        Self { dir, source }
    }
}

#[async_trait::async_trait]
impl ModuleDiscovery for ManifestDiscovery {
    fn source(&self) -> &str {
        &self.source
    }

    async fn discover(&self) -> Result<Vec<ModuleDeclaration>, BoxError> {
        let dir = self.dir.clone();
        let manifests =
            tokio::task::spawn_blocking(move || ManifestStore::new(dir)?.load_all()).await??;
        Ok(manifests.into_iter().map(|manifest| manifest.into_declaration()).collect())
    }
}

/// Runs every discovery concurrently and registers the results in source order.
///
/// Returns the number of declarations registered. The first failing source
/// aborts registration; declarations from earlier sources stay registered.
pub async fn discover_all(
    composer: &SharedComposer,
    sources: &[Box<dyn ModuleDiscovery>],
) -> modgraph::Result<usize> {
    let results = join_all(sources.iter().map(|source| source.discover())).await;

    let mut count = 0;
    for (source, result) in sources.iter().zip(results) {
        let decls = result.map_err(|e| {
            ModGraphError::Discovery(format!("Discovery from '{}' failed: {}", source.source(), e))
        })?;
        tracing::debug!("Discovered {} modules from {}", decls.len(), source.source());
        for decl in decls {
            composer.register(decl)?;
            count += 1;
        }
    }

    Ok(count)
}
