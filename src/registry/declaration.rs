use std::any::Any;
use std::fmt;
use std::sync::Arc;

use modgraph_core::{ModuleInfo, ModuleName, NameError};

use crate::error::BoxError;

/// Type-erased capability surface produced by a module's initializer
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Outcome of running an initializer
pub type InitResult = std::result::Result<Option<Capability>, BoxError>;

/// Side-effecting unit of work run once when a module is composed
#[derive(Clone)]
pub struct Initializer(Arc<dyn Fn() -> InitResult + Send + Sync>);

impl Initializer {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> InitResult + Send + Sync + 'static,
    {
        Self(Arc::new(init))
    }

    /// Wraps a constructor whose value becomes the module's capability
    pub fn providing<T, F>(build: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::new(move || build().map(|value| Some(Arc::new(value) as Capability)))
    }

    /// Runs the initializer
    pub fn run(&self) -> InitResult {
        (self.0)()
    }

    /// Whether both handles refer to the same initializer
    pub fn same_as(&self, other: &Initializer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Initializer(..)")
    }
}

/// A module's identity, dependency edges and optional initializer
#[derive(Debug, Clone)]
pub struct ModuleDeclaration {
    info: ModuleInfo,
    dependencies: Vec<ModuleName>,
    initializer: Option<Initializer>,
}

impl ModuleDeclaration {
    /// Creates a declaration with no dependencies
    pub fn new(name: ModuleName) -> Self {
        Self::from_info(ModuleInfo::new(name))
    }

    /// Creates a declaration with no dependencies from a module descriptor
    pub fn from_info(info: ModuleInfo) -> Self {
        Self { info, dependencies: Vec::new(), initializer: None }
    }

    /// Creates a declaration from plain strings, validating every name
    pub fn parse(name: &str, dependencies: &[&str]) -> Result<Self, NameError> {
        let dependencies =
            dependencies.iter().map(|dep| ModuleName::new(*dep)).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ModuleName::new(name)?).with_dependencies(dependencies))
    }

    /// Appends a dependency
    pub fn depends_on(mut self, dependency: ModuleName) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Appends several dependencies, keeping their order
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = ModuleName>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Add a description to the module
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.info.description = Some(description.into());
        self
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = Some(initializer);
        self
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn name(&self) -> &ModuleName {
        &self.info.name
    }

    pub fn dependencies(&self) -> &[ModuleName] {
        &self.dependencies
    }

    pub fn description(&self) -> Option<&str> {
        self.info.description.as_deref()
    }

    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }

    /// A facade only aggregates other modules
    pub fn is_facade(&self) -> bool {
        self.initializer.is_none() && !self.dependencies.is_empty()
    }

    /// Dependencies listed more than once
    pub fn duplicate_dependencies(&self) -> Vec<&ModuleName> {
        let mut duplicates = Vec::new();
        for (index, dep) in self.dependencies.iter().enumerate() {
            if self.dependencies[..index].contains(dep) && !duplicates.contains(&dep) {
                duplicates.push(dep);
            }
        }
        duplicates
    }

    /// Whether `other` declares exactly the same module
    pub fn same_as(&self, other: &ModuleDeclaration) -> bool {
        let same_initializer = match (&self.initializer, &other.initializer) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        };
        self.info == other.info && self.dependencies == other.dependencies && same_initializer
    }
}
