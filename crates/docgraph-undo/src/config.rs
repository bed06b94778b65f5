//! Undo engine configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UndoError};

/// Where a re-inserted child lands among its parent's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildPlacement {
    /// Back at the position recorded when the edit happened
    #[default]
    PreserveIndex,
    /// At the end of the parent's children
    Append,
}

/// Behaviour switches of an [`UndoManager`](crate::UndoManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Maximum number of history entries; oldest are evicted first
    pub max_entries: Option<usize>,
    /// Placement of children re-inserted by undo/redo
    pub child_placement: ChildPlacement,
    /// Push a no-op entry when a transaction closes without edits
    pub record_empty_groups: bool,
    /// Fold structural edits made during a transaction into the group
    pub group_structural_edits: bool,
    /// Clear history when the whole document is replaced
    pub reset_on_replace: bool,
}

impl Default for UndoConfig {
    fn default() -> Self {
        UndoConfig {
            max_entries: None,
            child_placement: ChildPlacement::PreserveIndex,
            record_empty_groups: false,
            group_structural_edits: true,
            reset_on_replace: true,
        }
    }
}

impl UndoConfig {
    /// Bound the history length
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Set the re-insert placement policy
    pub fn with_child_placement(mut self, placement: ChildPlacement) -> Self {
        self.child_placement = placement;
        self
    }

    /// Record transactions that closed without edits
    pub fn with_record_empty_groups(mut self, record: bool) -> Self {
        self.record_empty_groups = record;
        self
    }

    /// Fold structural edits into open transactions
    pub fn with_group_structural_edits(mut self, group: bool) -> Self {
        self.group_structural_edits = group;
        self
    }

    /// Clear history on whole-document replace
    pub fn with_reset_on_replace(mut self, reset: bool) -> Self {
        self.reset_on_replace = reset;
        self
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(UndoError::config("max_entries must be at least 1"));
        }
        Ok(())
    }

    /// Load from a JSON file
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| UndoError::config(format!("Failed to read config file: {}", e)))?;
        let config: UndoConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| UndoError::config(format!("Failed to read config file: {}", e)))?;
        let config: UndoConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file (auto-detect format)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "yaml" | "yml" => Self::load_from_yaml(path),
            "json" => Self::load_from_json(path),
            _ => Err(UndoError::config(
                "Unsupported file format. Use .yaml, .yml, or .json",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = UndoConfig::default();
        assert_eq!(config.max_entries, None);
        assert_eq!(config.child_placement, ChildPlacement::PreserveIndex);
        assert!(!config.record_empty_groups);
        assert!(config.group_structural_edits);
        assert!(config.reset_on_replace);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        let config = UndoConfig::default().with_max_entries(0);
        assert!(matches!(config.validate(), Err(UndoError::ConfigError(_))));
    }

    #[test]
    fn test_load_from_json_with_partial_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("undo.json");
        fs::write(&path, r#"{ "max_entries": 50, "child_placement": "append" }"#).unwrap();

        let config = UndoConfig::load_from_file(&path).unwrap();
        assert_eq!(config.max_entries, Some(50));
        assert_eq!(config.child_placement, ChildPlacement::Append);
        assert!(config.reset_on_replace);
    }

    #[test]
    fn test_load_from_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("undo.yml");
        fs::write(
            &path,
            "record_empty_groups: true\ngroup_structural_edits: false\n",
        )
        .unwrap();

        let config = UndoConfig::load_from_file(&path).unwrap();
        assert!(config.record_empty_groups);
        assert!(!config.group_structural_edits);
        assert_eq!(config.max_entries, None);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("undo.json");
        fs::write(&path, r#"{ "max_entries": 0 }"#).unwrap();

        assert!(matches!(
            UndoConfig::load_from_file(&path),
            Err(UndoError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("undo.ini");
        fs::write(&path, "max_entries=3").unwrap();

        assert!(matches!(
            UndoConfig::load_from_file(&path),
            Err(UndoError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = UndoConfig::load_from_file("/nonexistent/undo.json");
        assert!(matches!(result, Err(UndoError::ConfigError(_))));
    }
}
