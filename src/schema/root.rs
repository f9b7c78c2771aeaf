use std::fs;
use std::path::Path;

use modgraph_core::ModuleName;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModGraphError, Result};
use crate::registry::RegistrationPolicy;
use crate::schema::validation::{SchemaType, ValidationService, CURRENT_SCHEMA_VERSION};

/// File name of the root configuration inside the work directory
pub const ROOT_CONFIG_FILE: &str = "modgraph.yaml";

/// Root configuration schema for modgraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Version of the configuration schema
    pub version: String,
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,
    /// Top-level modules resolved at bootstrap
    #[serde(default)]
    pub roots: Vec<ModuleName>,
}

/// Global configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GlobalConfig {
    /// Directory holding module manifests, relative to the work directory
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: String,
    /// Re-registration policy
    #[serde(default)]
    pub policy: RegistrationPolicy,
}

fn default_manifest_dir() -> String {
    "modules".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self { manifest_dir: default_manifest_dir(), policy: RegistrationPolicy::default() }
    }
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION.to_string(),
            global: GlobalConfig::default(),
            roots: Vec::new(),
        }
    }
}

impl RootConfig {
    /// Parses and validates a YAML root configuration
    pub fn from_yaml(source: &str) -> Result<Self> {
        let value: serde_json::Value = serde_yaml::from_str(source)
            .map_err(|e| ModGraphError::Config(format!("Invalid root configuration: {}", e)))?;

        ValidationService::new()?.validate(SchemaType::Root, &value)?;

        serde_json::from_value(value)
            .map_err(|e| ModGraphError::Config(format!("Invalid root configuration: {}", e)))
    }

    /// Loads `modgraph.yaml` from the work directory, falling back to defaults
    pub fn load(work_dir: &Path) -> Result<Self> {
        let path = work_dir.join(ROOT_CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("No {} in {}, using defaults", ROOT_CONFIG_FILE, work_dir.display());
            return Ok(Self::default());
        }

        let source = fs::read_to_string(&path)?;
        Self::from_yaml(&source)
    }
}

#[cfg(test)]
mod tests {
    use jsonschema::JSONSchema;
    use pretty_assertions::assert_eq;
    use schemars::schema_for;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn compile() -> JSONSchema {
        let schema =
            serde_json::to_value(schema_for!(RootConfig)).expect("Failed to generate schema");
        JSONSchema::compile(&schema).expect("Failed to compile schema")
    }

    #[test]
    fn test_valid_root_config() {
        let validator = compile();
        let config = json!({
            "version": "1.0.0",
            "global": {
                "manifest_dir": "modules",
                "policy": "permissive"
            },
            "roots": ["services"]
        });

        assert!(validator.validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_root_config() {
        let validator = compile();
        let config = json!({
            "version": "1.0.0",
            "global": { "policy": "sometimes" },
            "roots": ["services"]
        });

        assert!(validator.validate(&config).is_err(), "Expected validation to fail");
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = RootConfig::from_yaml("version: 1.0.0\nroots: [services]\n").unwrap();
        assert_eq!(config.global, GlobalConfig::default());
        assert_eq!(config.roots, vec![ModuleName::from_static("services")]);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = RootConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_load_from_work_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(ROOT_CONFIG_FILE),
            "version: 1.0.0\nglobal:\n  manifest_dir: declared\n  policy: permissive\nroots:\n  - services\n",
        )
        .unwrap();

        let config = RootConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.global.manifest_dir, "declared");
        assert_eq!(config.global.policy, RegistrationPolicy::Permissive);
    }
}
