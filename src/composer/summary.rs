use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Summary of module graph validation results
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    /// Modules whose dependency graph resolves
    pub successful: Vec<String>,
    /// Modules and the reason they cannot be resolved
    pub failed: Vec<(String, String)>,
    /// Warnings by module
    pub warnings: BTreeMap<String, Vec<String>>,
    /// Validation timestamp
    pub timestamp: DateTime<Utc>,
}

impl Default for ValidationSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationSummary {
    pub fn new() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            warnings: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn successful_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Gets the total number of warnings
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(|w| w.len()).sum()
    }

    pub fn total_count(&self) -> usize {
        self.successful_count() + self.failed_count()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if all modules resolved (no failures)
    pub fn is_successful(&self) -> bool {
        self.failed.is_empty()
    }

    /// Adds a warning for a module
    pub fn add_warning(&mut self, module_name: String, warning: String) {
        self.warnings.entry(module_name).or_default().push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_summary() {
        let mut summary = ValidationSummary::new();
        summary.successful.push("services".to_string());
        summary.failed.push(("menu".to_string(), "Unknown module 'storage'".to_string()));
        summary.add_warning("services".to_string(), "first".to_string());
        summary.add_warning("services".to_string(), "second".to_string());

        assert_eq!(summary.total_count(), 2);
        assert_eq!(summary.warning_count(), 2);
        assert!(summary.has_warnings());
        assert!(!summary.is_successful());
    }
}
