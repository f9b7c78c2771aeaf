use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ModGraphError, Result};
use crate::schema::root::ROOT_CONFIG_FILE;
use crate::schema::{ModuleManifest, ValidationService};

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Reads and writes module manifests in a directory
pub struct ManifestStore {
    /// Directory holding one manifest per module
    base_path: PathBuf,
    validation: ValidationService,
}

impl ManifestStore {
    /// Create a new ManifestStore with the given base path
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self { base_path: base_path.into(), validation: ValidationService::new()? })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Initialize the manifest directory
    pub fn init(&self) -> Result<()> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).map_err(|e| {
                ModGraphError::Manifest(format!("Failed to create manifest directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Parses and validates manifest text; `origin` names the source in errors
    pub fn parse_manifest(&self, source: &str, origin: &str) -> Result<ModuleManifest> {
        // YAML is a superset of JSON, so one parser covers both formats
        let value: serde_json::Value = serde_yaml::from_str(source).map_err(|e| {
            ModGraphError::Manifest(format!("Failed to parse manifest '{}': {}", origin, e))
        })?;

        for warning in self.validation.validate_manifest(&value)? {
            tracing::warn!("Manifest '{}': {}", origin, warning);
        }

        serde_json::from_value(value).map_err(|e| {
            ModGraphError::Manifest(format!("Failed to parse manifest '{}': {}", origin, e))
        })
    }

    /// Load the manifest of a module
    pub fn load_manifest(&self, module_name: &str) -> Result<ModuleManifest> {
        let path = self.find_manifest(module_name).ok_or_else(|| {
            ModGraphError::Manifest(format!("No manifest found for module '{}'", module_name))
        })?;

        let source = fs::read_to_string(&path).map_err(|e| {
            ModGraphError::Manifest(format!(
                "Failed to read manifest for module '{}': {}",
                module_name, e
            ))
        })?;

        let manifest = self.parse_manifest(&source, &path.display().to_string())?;
        if manifest.name != module_name {
            return Err(ModGraphError::Manifest(format!(
                "Manifest {} declares module '{}' but is named '{}'",
                path.display(),
                manifest.name,
                module_name
            )));
        }
        Ok(manifest)
    }

    /// Save a module manifest as YAML, returning the written path
    pub fn save_manifest(&self, manifest: &ModuleManifest) -> Result<PathBuf> {
        self.init()?;
        let path = self.manifest_path(manifest.name.as_str());

        let source = serde_yaml::to_string(manifest).map_err(|e| {
            ModGraphError::Manifest(format!(
                "Failed to serialize manifest for module '{}': {}",
                manifest.name, e
            ))
        })?;

        fs::write(&path, source).map_err(|e| {
            ModGraphError::Manifest(format!(
                "Failed to write manifest for module '{}': {}",
                manifest.name, e
            ))
        })?;
        Ok(path)
    }

    /// List the module names that have a manifest, sorted
    pub fn list_manifests(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        if !self.base_path.exists() {
            return Ok(names);
        }

        for entry in fs::read_dir(&self.base_path).map_err(|e| {
            ModGraphError::Manifest(format!("Failed to read manifest directory: {}", e))
        })? {
            let entry = entry.map_err(|e| {
                ModGraphError::Manifest(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.file_name().map_or(false, |file| file == ROOT_CONFIG_FILE) {
                continue;
            }
            let is_manifest = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| MANIFEST_EXTENSIONS.contains(&ext));
            if !is_manifest {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Load every manifest in the directory
    pub fn load_all(&self) -> Result<Vec<ModuleManifest>> {
        self.list_manifests()?.iter().map(|name| self.load_manifest(name)).collect()
    }

    fn find_manifest(&self, module_name: &str) -> Option<PathBuf> {
        MANIFEST_EXTENSIONS
            .iter()
            .map(|ext| self.base_path.join(format!("{}.{}", module_name, ext)))
            .find(|path| path.exists())
    }

    /// Get the path a module's manifest is written to
    pub fn manifest_path(&self, module_name: &str) -> PathBuf {
        self.base_path.join(format!("{}.yaml", module_name))
    }
}

#[cfg(test)]
mod tests {
    use modgraph_core::ModuleName;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn manifest(name: &'static str, deps: &[&'static str]) -> ModuleManifest {
        ModuleManifest::new(
            ModuleName::from_static(name),
            deps.iter().map(|dep| ModuleName::from_static(dep)).collect(),
        )
    }

    #[test]
    fn test_store_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let store = ManifestStore::new(temp_dir.path().join("modules")).unwrap();

        assert!(store.init().is_ok());
        assert!(store.base_path().exists());
    }

    #[test]
    fn test_save_and_load_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let store = ManifestStore::new(temp_dir.path()).unwrap();

        let saved = manifest("services", &["services.menu", "services.storage"]);
        let path = store.save_manifest(&saved).unwrap();
        assert_eq!(path, temp_dir.path().join("services.yaml"));

        let loaded = store.load_manifest("services").unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_list_manifests_skips_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = ManifestStore::new(temp_dir.path()).unwrap();

        store.save_manifest(&manifest("menu", &[])).unwrap();
        fs::write(temp_dir.path().join("entity.json"), r#"{"name": "entity"}"#).unwrap();
        fs::write(temp_dir.path().join("README.md"), "# modules").unwrap();
        fs::write(temp_dir.path().join(ROOT_CONFIG_FILE), "version: 1.0.0\n").unwrap();

        assert_eq!(store.list_manifests().unwrap(), vec!["entity", "menu"]);
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_load_nonexistent_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let store = ManifestStore::new(temp_dir.path()).unwrap();

        assert!(store.load_manifest("nonexistent").is_err());
    }

    #[test]
    fn test_load_rejects_mismatched_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = ManifestStore::new(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("menu.yaml"), "name: storage\n").unwrap();

        assert!(matches!(store.load_manifest("menu"), Err(ModGraphError::Manifest(_))));
    }

    #[test]
    fn test_parse_rejects_invalid_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let store = ManifestStore::new(temp_dir.path()).unwrap();

        assert!(store.parse_manifest("dependencies: [a]\n", "inline").is_err());
        assert!(store.parse_manifest("name: [not, a, string]\n", "inline").is_err());
    }
}
