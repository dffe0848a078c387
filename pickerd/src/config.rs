//! Picker configuration
//!
//! The daemon reads a JSON document describing the host directories to mount
//! and the picker request to run. Command-line flags override file values.
//!
//! ```json
//! {
//!   "version": 1,
//!   "volumes": [{ "path": "/srv/esp", "label": "ESP" }],
//!   "title": ["Select a key file"],
//!   "start": "\\EFI",
//!   "filter": ".auth|.esl",
//!   "volume": 0
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Unsupported configuration version: {0}")]
    UnsupportedVersion(u32),

    #[error("No volumes configured")]
    NoVolumes,

    #[error("Volume index {index} out of range ({count} volumes)")]
    VolumeIndex { index: usize, count: usize },
}

/// One host directory mounted as a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Host directory acting as the volume root
    pub path: String,
    /// Volume label; blank labels fall back to the device path
    #[serde(default)]
    pub label: Option<String>,
}

impl VolumeConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Everything one picker run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Format version
    pub version: u32,
    #[serde(default)]
    pub volumes: Vec<VolumeConfig>,
    #[serde(default = "default_title")]
    pub title: Vec<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    /// Index into `volumes`; skips the volume menu
    #[serde(default)]
    pub volume: Option<usize>,
}

fn default_title() -> Vec<String> {
    vec!["Select a file".to_string()]
}

impl PickerConfig {
    /// Current version of the configuration format
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            volumes: Vec::new(),
            title: default_title(),
            start: None,
            filter: None,
            volume: None,
        }
    }

    /// Parses and validates a JSON document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.version != Self::CURRENT_VERSION {
            return Err(ConfigError::UnsupportedVersion(config.version));
        }
        Ok(config)
    }

    /// Reads a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks that the configuration can be run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.volumes.is_empty() {
            return Err(ConfigError::NoVolumes);
        }
        if let Some(index) = self.volume {
            if index >= self.volumes.len() {
                return Err(ConfigError::VolumeIndex {
                    index,
                    count: self.volumes.len(),
                });
            }
        }
        Ok(())
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document() {
        let config = PickerConfig::from_json(r#"{ "version": 1 }"#).unwrap();
        assert_eq!(config, PickerConfig::new());
        assert_eq!(config.validate(), Err(ConfigError::NoVolumes));
    }

    #[test]
    fn test_full_document() {
        let text = r#"{
            "version": 1,
            "volumes": [{ "path": "/srv/esp", "label": "ESP" }, { "path": "/srv/data" }],
            "title": ["Pick", "a key"],
            "start": "\\EFI",
            "filter": ".auth|.esl",
            "volume": 1
        }"#;
        let config = PickerConfig::from_json(text).unwrap();
        assert_eq!(config.volumes[0], VolumeConfig::new("/srv/esp").with_label("ESP"));
        assert_eq!(config.volumes[1].label, None);
        assert_eq!(config.start.as_deref(), Some("\\EFI"));
        assert_eq!(config.filter.as_deref(), Some(".auth|.esl"));
        assert_eq!(config.volume, Some(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_version() {
        let err = PickerConfig::from_json(r#"{ "version": 2 }"#).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedVersion(2));
    }

    #[test]
    fn test_malformed_document() {
        let err = PickerConfig::from_json("{ version: 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_volume_index_out_of_range() {
        let mut config = PickerConfig::new();
        config.volumes.push(VolumeConfig::new("/a"));
        config.volume = Some(3);
        assert_eq!(
            config.validate(),
            Err(ConfigError::VolumeIndex { index: 3, count: 1 })
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = PickerConfig::new();
        config.volumes.push(VolumeConfig::new("/a").with_label("A"));
        config.filter = Some(".efi".to_string());
        let text = config.to_json().unwrap();
        assert_eq!(PickerConfig::from_json(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PickerConfig::load(Path::new("/nonexistent/pickerd.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
