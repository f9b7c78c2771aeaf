use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use modgraph_core::ModuleName;

use crate::registry::{Capability, ModuleDeclaration};

/// An initialized module
pub struct ModuleInstance {
    name: ModuleName,
    dependencies: Vec<ModuleName>,
    capability: Option<Capability>,
    initialized_at: DateTime<Utc>,
}

impl ModuleInstance {
    pub(crate) fn new(decl: &ModuleDeclaration, capability: Option<Capability>) -> Self {
        Self {
            name: decl.name().clone(),
            dependencies: decl.dependencies().to_vec(),
            capability,
            initialized_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    pub fn dependencies(&self) -> &[ModuleName] {
        &self.dependencies
    }

    /// Value produced by the module's initializer, if any
    pub fn capability(&self) -> Option<&Capability> {
        self.capability.as_ref()
    }

    /// The capability downcast to a concrete type
    pub fn capability_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.capability.clone()?.downcast::<T>().ok()
    }

    pub fn initialized_at(&self) -> DateTime<Utc> {
        self.initialized_at
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("has_capability", &self.capability.is_some())
            .field("initialized_at", &self.initialized_at)
            .finish()
    }
}

/// A resolved module together with everything it transitively depends on
#[derive(Debug)]
pub struct Aggregate {
    root: ModuleName,
    /// Initialization order, dependencies first
    order: Vec<ModuleName>,
    modules: BTreeMap<ModuleName, Arc<ModuleInstance>>,
    composed_at: DateTime<Utc>,
}

impl Aggregate {
    pub(crate) fn new(root: ModuleName, members: Vec<Arc<ModuleInstance>>) -> Self {
        let order = members.iter().map(|instance| instance.name().clone()).collect();
        let modules =
            members.into_iter().map(|instance| (instance.name().clone(), instance)).collect();
        Self { root, order, modules, composed_at: Utc::now() }
    }

    /// The module this aggregate was resolved for
    pub fn root(&self) -> &ModuleName {
        &self.root
    }

    /// Member names in initialization order
    pub fn order(&self) -> &[ModuleName] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ModuleInstance>> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Typed capability of a member module
    pub fn capability<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.modules.get(name)?.capability_as::<T>()
    }

    /// Members in initialization order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModuleInstance>> + '_ {
        self.order.iter().filter_map(|name| self.modules.get(name))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn composed_at(&self) -> DateTime<Utc> {
        self.composed_at
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_aggregate_lookup() {
        let storage = ModuleDeclaration::parse("storage", &[]).unwrap();
        let settings = ModuleDeclaration::parse("settings", &["storage"]).unwrap();

        let capability: Capability = Arc::new(42_u32);
        let aggregate = Aggregate::new(
            ModuleName::from_static("settings"),
            vec![
                Arc::new(ModuleInstance::new(&storage, Some(capability))),
                Arc::new(ModuleInstance::new(&settings, None)),
            ],
        );

        assert_eq!(aggregate.root().as_str(), "settings");
        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate.order()[0].as_str(), "storage");
        assert_eq!(aggregate.capability::<u32>("storage").as_deref(), Some(&42));
        assert!(aggregate.capability::<String>("storage").is_none());
        assert!(aggregate.capability::<u32>("settings").is_none());
        assert!(!aggregate.contains("menu"));

        let names: Vec<&str> = aggregate.iter().map(|m| m.name().as_str()).collect();
        assert_eq!(names, vec!["storage", "settings"]);
    }
}
