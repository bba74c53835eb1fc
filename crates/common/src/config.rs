use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Engine-wide tunables. Every field has a default, so a config file only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// "Ignore bounds" flag given to freshly created nodes.
    pub default_ignore_bounds: bool,
    /// Number of child slots a new group starts with.
    pub initial_child_capacity: usize,
    /// Clean frames after which a GPU resource is reported as stable.
    pub stable_frame_threshold: u64,
    /// Maximum number of render contexts registered at once.
    pub max_render_contexts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ignore_bounds: false,
            initial_child_capacity: 4,
            stable_frame_threshold: 3,
            max_render_contexts: 8,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_child_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_child_capacity must be at least 1".into(),
            ));
        }
        if self.max_render_contexts == 0 {
            return Err(ConfigError::Invalid(
                "max_render_contexts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_child_capacity, 4);
        assert_eq!(config.stable_frame_threshold, 3);
        assert!(!config.default_ignore_bounds);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config = EngineConfig::from_yaml_str("default_ignore_bounds: true\n").unwrap();
        assert!(config.default_ignore_bounds);
        assert_eq!(config.max_render_contexts, 8);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = EngineConfig::from_yaml_str("initial_child_capacity: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = EngineConfig::from_yaml_str("max_render_contexts: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn load_from_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "stable_frame_threshold: 10").unwrap();
        writeln!(tmp, "max_render_contexts: 2").unwrap();

        let config = EngineConfig::load(tmp.path()).unwrap();
        assert_eq!(config.stable_frame_threshold, 10);
        assert_eq!(config.max_render_contexts, 2);
    }

    #[test]
    fn yaml_round_trip_preserves_values() {
        let config = EngineConfig {
            initial_child_capacity: 16,
            ..EngineConfig::default()
        };
        let text = config.to_yaml_string().unwrap();
        assert_eq!(EngineConfig::from_yaml_str(&text).unwrap(), config);
    }
}
