//! Resolution of module declarations into initialized aggregates.
//!
//! A resolution pass runs in two phases. The planning phase walks the
//! dependency graph depth-first and produces a post-order of module names,
//! failing on unknown modules and cycles before anything has run. The
//! initialization phase then walks that order and runs every initializer that
//! has not yet run in this composer, so dependencies always finish before
//! their dependents.

mod aggregate;
mod shared;
mod summary;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub use aggregate::{Aggregate, ModuleInstance};
use modgraph_core::ModuleName;
pub use shared::SharedComposer;
pub use summary::ValidationSummary;

use crate::error::ComposerError;
use crate::registry::{ModuleDeclaration, ModuleRegistry, RegistrationPolicy};

/// Per-pass traversal state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolutionState {
    Unvisited,
    InProgress,
    Resolved,
}

/// Depth-first traversal over the registry for one resolution pass
struct Pass<'r> {
    registry: &'r ModuleRegistry,
    states: HashMap<ModuleName, ResolutionState>,
    /// Chain from the root down to the module being visited
    path: Vec<ModuleName>,
    /// Post-order of visited modules
    order: Vec<ModuleName>,
}

impl<'r> Pass<'r> {
    fn new(registry: &'r ModuleRegistry) -> Self {
        Self { registry, states: HashMap::new(), path: Vec::new(), order: Vec::new() }
    }

    fn state(&self, name: &ModuleName) -> ResolutionState {
        self.states.get(name).copied().unwrap_or(ResolutionState::Unvisited)
    }

    /// Marks a module in progress; `false` when it is already resolved
    fn enter(&mut self, name: &ModuleName) -> Result<bool, ComposerError> {
        match self.state(name) {
            ResolutionState::Resolved => Ok(false),
            ResolutionState::InProgress => {
                let mut cycle = self.path.clone();
                cycle.push(name.clone());
                Err(ComposerError::CyclicDependency(cycle))
            }
            ResolutionState::Unvisited => {
                self.states.insert(name.clone(), ResolutionState::InProgress);
                self.path.push(name.clone());
                Ok(true)
            }
        }
    }

    fn leave(&mut self, name: &ModuleName) {
        self.path.pop();
        self.states.insert(name.clone(), ResolutionState::Resolved);
        self.order.push(name.clone());
    }

    /// Walks `root` and its dependencies depth-first on an explicit stack
    fn visit<'a>(&mut self, root: &'a ModuleDeclaration) -> Result<(), ComposerError>
    where
        'r: 'a,
    {
        if !self.enter(root.name())? {
            return Ok(());
        }

        let registry = self.registry;
        // Each frame holds a declaration and the index of its next dependency
        let mut stack: Vec<(&'a ModuleDeclaration, usize)> = vec![(root, 0)];
        while let Some((decl, next)) = stack.last_mut() {
            let decl: &'a ModuleDeclaration = *decl;
            match decl.dependencies().get(*next) {
                Some(dependency) => {
                    *next += 1;
                    let dep_decl =
                        registry.lookup(dependency).ok_or_else(|| ComposerError::UnknownModule {
                            name: dependency.clone(),
                            required_by: Some(decl.name().clone()),
                        })?;
                    if self.enter(dep_decl.name())? {
                        stack.push((dep_decl, 0));
                    }
                }
                None => {
                    stack.pop();
                    self.leave(decl.name());
                }
            }
        }
        Ok(())
    }
}

/// Resolves modules from an owned registry and caches the results
#[derive(Debug, Default)]
pub struct Composer {
    registry: ModuleRegistry,
    /// Every module initialized so far, across all passes
    instances: HashMap<ModuleName, Arc<ModuleInstance>>,
    /// Aggregates by the name they were resolved for
    cache: HashMap<ModuleName, Arc<Aggregate>>,
}

impl Composer {
    /// Creates a composer with an empty registry
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self::with_registry(ModuleRegistry::new(policy))
    }

    /// Creates a composer owning an already populated registry
    pub fn with_registry(registry: ModuleRegistry) -> Self {
        Self { registry, instances: HashMap::new(), cache: HashMap::new() }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Registers a declaration with the owned registry
    pub fn register(&mut self, decl: ModuleDeclaration) -> Result<(), ComposerError> {
        self.registry.register(decl).map_err(ComposerError::from)
    }

    /// The cached aggregate for a module, if it has been resolved
    pub fn cached(&self, name: &str) -> Option<Arc<Aggregate>> {
        self.cache.get(name).cloned()
    }

    /// Whether the module's initializer has run
    pub fn is_initialized(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    /// Initialization order for a module, without running anything
    pub fn plan(&self, name: &ModuleName) -> Result<Vec<ModuleName>, ComposerError> {
        let decl = self.registry.lookup(name).ok_or_else(|| ComposerError::UnknownModule {
            name: name.clone(),
            required_by: None,
        })?;
        self.plan_from(decl)
    }

    fn plan_from(&self, root: &ModuleDeclaration) -> Result<Vec<ModuleName>, ComposerError> {
        let mut pass = Pass::new(&self.registry);
        pass.visit(root)?;
        Ok(pass.order)
    }

    /// Resolves a module and everything it depends on into a cached aggregate
    pub fn resolve(&mut self, name: &ModuleName) -> Result<Arc<Aggregate>, ComposerError> {
        if let Some(aggregate) = self.cache.get(name) {
            return Ok(Arc::clone(aggregate));
        }

        let _span = tracing::info_span!("resolve", module = %name).entered();
        let root = self
            .registry
            .lookup(name)
            .cloned()
            .ok_or_else(|| ComposerError::UnknownModule { name: name.clone(), required_by: None })?;

        self.compose(root)
    }

    /// Resolves a synthetic facade depending on exactly `names`
    pub fn resolve_all(&mut self, names: &[ModuleName]) -> Result<Arc<Aggregate>, ComposerError> {
        let facade = ModuleName::facade_of(names);
        if let Some(aggregate) = self.cache.get(&facade) {
            return Ok(Arc::clone(aggregate));
        }

        let _span = tracing::info_span!("resolve", module = %facade).entered();
        let root = ModuleDeclaration::new(facade).with_dependencies(names.iter().cloned());
        self.compose(root)
    }

    fn compose(&mut self, root: ModuleDeclaration) -> Result<Arc<Aggregate>, ComposerError> {
        let order = self.plan_from(&root)?;
        tracing::debug!(
            "Planned {} modules: {}",
            order.len(),
            order.iter().map(ModuleName::as_str).collect::<Vec<_>>().join(", ")
        );

        let mut members = Vec::with_capacity(order.len());
        for name in &order {
            members.push(self.initialize(name, &root)?);
        }

        let aggregate = Arc::new(Aggregate::new(root.name().clone(), members));
        self.cache.insert(root.name().clone(), Arc::clone(&aggregate));
        tracing::info!("Resolved module '{}' ({} modules)", root.name(), aggregate.len());
        Ok(aggregate)
    }

    /// Runs a module's initializer unless it already ran
    fn initialize(
        &mut self,
        name: &ModuleName,
        root: &ModuleDeclaration,
    ) -> Result<Arc<ModuleInstance>, ComposerError> {
        if let Some(instance) = self.instances.get(name) {
            return Ok(Arc::clone(instance));
        }

        let decl = if name == root.name() {
            root.clone()
        } else {
            self.registry.lookup(name).cloned().ok_or_else(|| ComposerError::UnknownModule {
                name: name.clone(),
                required_by: None,
            })?
        };

        let capability = match decl.initializer() {
            Some(initializer) => initializer.run().map_err(|cause| {
                tracing::error!("Initializer of module '{}' failed: {}", name, cause);
                ComposerError::InitializationFailed { name: name.clone(), cause }
            })?,
            None => None,
        };

        let instance = Arc::new(ModuleInstance::new(&decl, capability));
        self.instances.insert(name.clone(), Arc::clone(&instance));
        if !name.is_synthetic() {
            self.registry.freeze(name);
        }
        tracing::debug!("Initialized module '{}'", name);
        Ok(instance)
    }

    /// Registered modules that depend on `name`, directly or transitively
    pub fn dependents(&self, name: &str) -> Vec<ModuleName> {
        let mut reverse: HashMap<&str, Vec<&ModuleName>> = HashMap::new();
        for decl in self.registry.declarations() {
            for dependency in decl.dependencies() {
                reverse.entry(dependency.as_str()).or_default().push(decl.name());
            }
        }

        let mut found = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([name]);
        while let Some(current) = queue.pop_front() {
            for &dependent in reverse.get(current).into_iter().flatten() {
                if found.insert(dependent.clone()) {
                    queue.push_back(dependent.as_str());
                }
            }
        }
        found.remove(name);
        found.into_iter().collect()
    }

    /// Plans every registered module and reports which ones resolve
    pub fn validate_all(&self) -> ValidationSummary {
        let mut summary = ValidationSummary::new();
        let depended_on: HashSet<&str> = self
            .registry
            .declarations()
            .flat_map(|decl| decl.dependencies().iter().map(ModuleName::as_str))
            .collect();

        for decl in self.registry.declarations() {
            let name = decl.name();
            for duplicate in decl.duplicate_dependencies() {
                summary.add_warning(
                    name.to_string(),
                    format!("Dependency '{}' is listed more than once", duplicate),
                );
            }
            if !decl.is_facade() && !depended_on.contains(name.as_str()) {
                summary.add_warning(name.to_string(), "No module depends on this module".to_string());
            }

            match self.plan_from(decl) {
                Ok(_) => summary.successful.push(name.to_string()),
                Err(err) => summary.failed.push((name.to_string(), err.to_string())),
            }
        }

        summary
    }
}
