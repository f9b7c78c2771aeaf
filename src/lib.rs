pub mod bootstrap;
pub mod composer;
pub mod error;
pub mod registry;
pub mod schema;

pub use bootstrap::{Application, Bootstrap};
pub use composer::{Aggregate, Composer, ModuleInstance, SharedComposer, ValidationSummary};
pub use error::{BoxError, ComposerError, ModGraphError, RegistryError, Result};
pub use modgraph_core::{ModuleInfo, ModuleKey, ModuleName, NameError};
pub use registry::{
    Capability, Initializer, ModuleDeclaration, ModuleRegistry, RegistrationPolicy,
};
