use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::JSONSchema;
use schemars::schema_for;
use semver::Version;

use crate::error::{ModGraphError as Error, Result};
use crate::schema::manifest::ModuleManifest;
use crate::schema::root::RootConfig;

/// Current schema version used by the system
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Type of schema to validate against
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SchemaType {
    /// Root configuration schema
    Root,
    /// Module manifest schema
    Manifest,
}

/// Result of version compatibility check
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VersionCompatibility {
    /// Versions are compatible
    Compatible,
    /// Minor incompatibility (forward-compatible)
    MinorIncompatible,
    /// Major incompatibility (breaking changes)
    MajorIncompatible,
}

/// Checks compatibility between versions
pub fn check_version_compatibility(version: &str, current: &str) -> VersionCompatibility {
    let (Ok(v1), Ok(v2)) = (Version::parse(version), Version::parse(current)) else {
        return VersionCompatibility::MajorIncompatible;
    };

    if v1.major != v2.major {
        VersionCompatibility::MajorIncompatible
    } else if v1.minor != v2.minor {
        VersionCompatibility::MinorIncompatible
    } else {
        VersionCompatibility::Compatible
    }
}

/// A compiled JSON schema validator
#[derive(Clone)]
pub struct CompiledSchema {
    schema: Arc<JSONSchema>,
}

impl CompiledSchema {
    pub fn new(schema: JSONSchema) -> Self {
        Self { schema: Arc::new(schema) }
    }

    /// Validates a value against the schema
    pub fn validate(&self, value: &serde_json::Value) -> std::result::Result<(), Vec<String>> {
        self.schema.validate(value).map_err(|errors| errors.map(|e| e.to_string()).collect())
    }
}

/// Validates manifests and root configuration against their generated schemas
#[derive(Clone)]
pub struct ValidationService {
    schemas: HashMap<SchemaType, CompiledSchema>,
}

impl ValidationService {
    /// Creates a validation service with every schema compiled
    pub fn new() -> Result<Self> {
        let mut schemas = HashMap::new();
        for schema_type in [SchemaType::Root, SchemaType::Manifest] {
            schemas.insert(schema_type, Self::compile_schema(schema_type)?);
        }
        Ok(Self { schemas })
    }

    /// Compiles a schema of the specified type
    pub fn compile_schema(schema_type: SchemaType) -> Result<CompiledSchema> {
        let generated = match schema_type {
            SchemaType::Root => serde_json::to_value(schema_for!(RootConfig)),
            SchemaType::Manifest => serde_json::to_value(schema_for!(ModuleManifest)),
        }
        .map_err(|e| Error::Validation(format!("Failed to generate schema: {}", e)))?;

        let schema = JSONSchema::compile(&generated)
            .map_err(|e| Error::Validation(format!("Failed to compile schema: {}", e)))?;

        Ok(CompiledSchema::new(schema))
    }

    /// Validates a value against a schema
    pub fn validate(&self, schema_type: SchemaType, value: &serde_json::Value) -> Result<()> {
        let schema = self.schemas.get(&schema_type).ok_or_else(|| {
            Error::Validation(format!("Schema {:?} has not been compiled", schema_type))
        })?;

        schema.validate(value).map_err(|errors| {
            Error::Validation(format!("Schema validation failed: {}", errors.join(", ")))
        })
    }

    /// Validates a module manifest, returning warnings for tolerated issues
    pub fn validate_manifest(&self, value: &serde_json::Value) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let manifest_version = value
            .get("schema_version")
            .and_then(|v| v.as_str())
            .unwrap_or(CURRENT_SCHEMA_VERSION);

        match check_version_compatibility(manifest_version, CURRENT_SCHEMA_VERSION) {
            VersionCompatibility::Compatible => {}
            VersionCompatibility::MinorIncompatible => {
                let warning = format!(
                    "Minor schema version incompatibility: manifest version {} vs current {}",
                    manifest_version, CURRENT_SCHEMA_VERSION
                );
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            VersionCompatibility::MajorIncompatible => {
                return Err(Error::IncompatibleVersion(format!(
                    "Schema version {} is incompatible with current version {}",
                    manifest_version, CURRENT_SCHEMA_VERSION
                )));
            }
        }

        self.validate(SchemaType::Manifest, value)?;
        Ok(warnings)
    }
}
