use std::collections::HashMap;

use async_trait::async_trait;
use modgraph::{BoxError, Initializer, ModuleDeclaration};
use modgraph_core::{ModuleKey, ModuleName};

use crate::ModuleDiscovery;

/// Name of the facade aggregating every service module
pub const SERVICES_FACADE: &str = "superdesk.services";

/// Modules aggregated by the services facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceModule {
    Translate,
    Upload,
    Notify,
    Settings,
    Storage,
    Menu,
    Permissions,
    PermissionsService,
    Activity,
    Keyboard,
    UserSettings,
    Entity,
    Server,
}

impl ModuleKey for ServiceModule {
    fn all() -> &'static [Self] {
        &[
            ServiceModule::Translate,
            ServiceModule::Upload,
            ServiceModule::Notify,
            ServiceModule::Settings,
            ServiceModule::Storage,
            ServiceModule::Menu,
            ServiceModule::Permissions,
            ServiceModule::PermissionsService,
            ServiceModule::Activity,
            ServiceModule::Keyboard,
            ServiceModule::UserSettings,
            ServiceModule::Entity,
            ServiceModule::Server,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            ServiceModule::Translate => "superdesk.services.translate",
            ServiceModule::Upload => "superdesk.services.upload",
            ServiceModule::Notify => "superdesk.services.notify",
            ServiceModule::Settings => "superdesk.services.settings",
            ServiceModule::Storage => "superdesk.services.storage",
            ServiceModule::Menu => "superdesk.services.menu",
            ServiceModule::Permissions => "superdesk.services.permissions",
            ServiceModule::PermissionsService => "superdesk.services.permissionsService",
            ServiceModule::Activity => "superdesk.services.activity",
            ServiceModule::Keyboard => "superdesk.services.keyboard",
            ServiceModule::UserSettings => "superdesk.userSettings",
            ServiceModule::Entity => "superdesk.entity",
            ServiceModule::Server => "superdesk.server",
        }
    }
}

impl ServiceModule {
    /// Placeholder leaf declaration for hosts that have no real implementation
    pub fn declaration(self) -> ModuleDeclaration {
        ModuleDeclaration::new(self.module_name())
    }
}

/// Declares the services facade as data.
///
/// Only the facade itself is declared; each service module is registered by
/// whoever implements it.
#[derive(Default)]
pub struct ServicesFacade {
    /// Leaf declarations provided together with the facade
    leaves: HashMap<ServiceModule, ModuleDeclaration>,
}

impl ServicesFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides a service module together with the facade
    pub fn with_service(mut self, module: ServiceModule, initializer: Initializer) -> Self {
        self.leaves.insert(module, module.declaration().with_initializer(initializer));
        self
    }

    /// The facade declaration: depends on every service module, in order
    pub fn facade() -> ModuleDeclaration {
        ModuleDeclaration::new(ModuleName::from_static(SERVICES_FACADE))
            .with_dependencies(ServiceModule::all().iter().map(|module| module.module_name()))
            .with_description("Aggregates the service modules")
    }

    /// The facade followed by the provided leaves in declaration order
    pub fn declarations(&self) -> Vec<ModuleDeclaration> {
        let leaves = ServiceModule::all().iter().filter_map(|module| self.leaves.get(module).cloned());
        std::iter::once(Self::facade()).chain(leaves).collect()
    }
}

#[async_trait]
impl ModuleDiscovery for ServicesFacade {
    fn source(&self) -> &str {
        SERVICES_FACADE
    }

    async fn discover(&self) -> Result<Vec<ModuleDeclaration>, BoxError> {
        Ok(self.declarations())
    }
}
