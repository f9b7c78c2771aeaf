use modgraph_core::{ModuleInfo, ModuleName};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::registry::ModuleDeclaration;
use crate::schema::validation::CURRENT_SCHEMA_VERSION;

/// On-disk description of a module declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModuleManifest {
    /// Version of the manifest schema
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Name of the module
    pub name: ModuleName,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Modules this module depends on
    #[serde(default)]
    pub dependencies: Vec<ModuleName>,
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

impl ModuleManifest {
    pub fn new(name: ModuleName, dependencies: Vec<ModuleName>) -> Self {
        Self { schema_version: default_schema_version(), name, description: None, dependencies }
    }

    /// Describes a declaration; the initializer is not representable and is dropped
    pub fn from_declaration(decl: &ModuleDeclaration) -> Self {
        let ModuleInfo { name, description } = decl.info().clone();
        Self {
            schema_version: default_schema_version(),
            name,
            description,
            dependencies: decl.dependencies().to_vec(),
        }
    }

    /// The module descriptor this manifest carries
    pub fn info(&self) -> ModuleInfo {
        ModuleInfo { name: self.name.clone(), description: self.description.clone() }
    }

    /// Converts the manifest into a declaration without initializer
    pub fn into_declaration(self) -> ModuleDeclaration {
        let info = ModuleInfo { name: self.name, description: self.description };
        ModuleDeclaration::from_info(info).with_dependencies(self.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_manifest_defaults() {
        let manifest: ModuleManifest = serde_yaml::from_str("name: services.menu\n").unwrap();
        assert_eq!(manifest.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.description.is_none());
    }

    #[test]
    fn test_manifest_into_declaration() {
        let yaml = r#"
name: services
description: Aggregates the service modules
dependencies:
  - services.translate
  - services.upload
"#;
        let manifest: ModuleManifest = serde_yaml::from_str(yaml).unwrap();
        let info = manifest.info();
        let decl = manifest.into_declaration();

        assert_eq!(decl.info(), &info);

        assert_eq!(decl.name().as_str(), "services");
        assert_eq!(decl.description(), Some("Aggregates the service modules"));
        assert_eq!(
            decl.dependencies(),
            &[
                ModuleName::from_static("services.translate"),
                ModuleName::from_static("services.upload")
            ]
        );
        assert!(decl.initializer().is_none());
    }

    #[test]
    fn test_manifest_rejects_unknown_fields() {
        let result = serde_yaml::from_str::<ModuleManifest>("name: menu\nversion: 2\n");
        assert!(result.is_err());
    }
}
