pub mod manifest;
pub mod root;
pub mod validation;

pub use manifest::ModuleManifest;
pub use root::{GlobalConfig, RootConfig, ROOT_CONFIG_FILE};
pub use validation::{CompiledSchema, SchemaType, ValidationService, VersionCompatibility};
