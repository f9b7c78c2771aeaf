mod declaration;
mod git;
mod store;

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;

pub use declaration::{Capability, InitResult, Initializer, ModuleDeclaration};
pub use git::ManifestRepository;
use modgraph_core::ModuleName;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use store::ManifestStore;

use crate::error::{RegistryError, Result};

/// What happens when a name is declared twice
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// Reject a different declaration under an existing name
    #[default]
    Strict,
    /// Last declaration wins
    Permissive,
}

impl fmt::Display for RegistrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationPolicy::Strict => write!(f, "strict"),
            RegistrationPolicy::Permissive => write!(f, "permissive"),
        }
    }
}

/// Table of module declarations keyed by name
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    /// Declarations, ordered by name
    declarations: BTreeMap<ModuleName, ModuleDeclaration>,
    /// Names whose declaration has been resolved and can no longer change
    frozen: HashSet<ModuleName>,
    policy: RegistrationPolicy,
}

impl ModuleRegistry {
    /// Creates an empty registry with the given re-registration policy
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self { declarations: BTreeMap::new(), frozen: HashSet::new(), policy }
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    /// Registers a module declaration
    pub fn register(&mut self, decl: ModuleDeclaration) -> std::result::Result<(), RegistryError> {
        let name = decl.name().clone();

        if let Some(existing) = self.declarations.get(&name) {
            if existing.same_as(&decl) {
                tracing::debug!("Module '{}' re-declared identically, ignoring", name);
                return Ok(());
            }
            if self.frozen.contains(&name) {
                return Err(RegistryError::FrozenModule(name));
            }
            match self.policy {
                RegistrationPolicy::Strict => return Err(RegistryError::DuplicateModule(name)),
                RegistrationPolicy::Permissive => {
                    tracing::warn!("Module '{}' re-declared, replacing previous declaration", name);
                }
            }
        } else {
            tracing::debug!(
                "Registered module '{}' with {} dependencies",
                name,
                decl.dependencies().len()
            );
        }

        self.declarations.insert(name, decl);
        Ok(())
    }

    /// Gets a declaration by name
    pub fn lookup<Q>(&self, name: &Q) -> Option<&ModuleDeclaration>
    where
        ModuleName: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.declarations.get(name)
    }

    pub fn contains<Q>(&self, name: &Q) -> bool
    where
        ModuleName: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.declarations.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &ModuleName> + '_ {
        self.declarations.keys()
    }

    /// Registered declarations in name order
    pub fn declarations(&self) -> impl Iterator<Item = &ModuleDeclaration> + '_ {
        self.declarations.values()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Whether the module has been resolved
    pub fn is_frozen<Q>(&self, name: &Q) -> bool
    where
        ModuleName: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.frozen.contains(name)
    }

    pub(crate) fn freeze(&mut self, name: &ModuleName) {
        self.frozen.insert(name.clone());
    }

    /// Registers every manifest in the store; returns how many were registered
    pub fn register_manifests(&mut self, store: &ManifestStore) -> Result<usize> {
        let manifests = store.load_all()?;
        let count = manifests.len();
        for manifest in manifests {
            self.register(manifest.into_declaration())?;
        }
        tracing::info!("Registered {} module manifests from {}", count, store.base_path().display());
        Ok(count)
    }
}
