//! Host configuration for the binary
//!
//! Describes what the host would otherwise supply at runtime: the layout
//! catalog and the monitor list, plus where the settings store lives.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::layouts::DEFAULT_LAYOUT;
use crate::layouts::Catalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Layout catalog, in menu order
    #[serde(default = "default_layouts")]
    pub layouts: Vec<String>,

    /// One scale factor per monitor, in topology order
    #[serde(default = "default_monitors")]
    pub monitors: Vec<f64>,

    /// Settings store location (defaults to the XDG data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_layouts() -> Vec<String> {
    vec![DEFAULT_LAYOUT.to_string()]
}

fn default_monitors() -> Vec<f64> {
    vec![1.0]
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            layouts: default_layouts(),
            monitors: default_monitors(),
            store_path: None,
        }
    }
}

impl HostConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load configuration from `path`, writing defaults there if the file
    /// does not exist yet. Returns the config and whether it was created.
    pub fn load(path: &Path) -> Result<(Self, bool)> {
        if !path.exists() {
            let config = HostConfig::default();
            config.save(path)?;
            return Ok((config, true));
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: HostConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
        Ok((config, false))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Layout catalog, falling back to the default layout if the list is
    /// empty
    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.layouts.clone()).unwrap_or_else(|| Catalog::single(DEFAULT_LAYOUT))
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(crate::persistence::JsonSettingsStore::default_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: HostConfig = serde_json::from_str(r#"{"monitors": [1.0, 1.5]}"#).unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.layouts, vec![DEFAULT_LAYOUT.to_string()]);
        assert_eq!(config.monitors, vec![1.0, 1.5]);
        assert_eq!(config.store_path, None);
    }

    #[test]
    fn test_empty_layout_list_falls_back() {
        let config = HostConfig {
            layouts: vec![],
            ..HostConfig::default()
        };
        assert_eq!(config.catalog().ids(), &[DEFAULT_LAYOUT.to_string()]);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = std::env::temp_dir().join(format!("tiling-overrides-config-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("config.json");

        let (config, created) = HostConfig::load(&path).unwrap();
        assert!(created);
        assert_eq!(config, HostConfig::default());

        let (again, created) = HostConfig::load(&path).unwrap();
        assert!(!created);
        assert_eq!(again, config);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = std::env::temp_dir().join(format!("tiling-overrides-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, "{ layouts: ").unwrap();

        assert!(HostConfig::load(&path).is_err());
    }
}
