use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub version: u32,
    /// Provider-qualified model identifier, e.g. "openai:gpt-4o".
    pub model: String,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub parallel: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub cache: Option<bool>,
    pub retries: Option<u32>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl RunConfig {
    pub fn new(model: &str) -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            model: model.to_string(),
            settings: Settings::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let cfg: RunConfig = serde_yaml::from_str(&raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg: RunConfig = serde_yaml::from_str("version: 1\nmodel: openai:gpt-4o\n").unwrap();
        assert_eq!(cfg.model, "openai:gpt-4o");
        assert!(cfg.settings.parallel.is_none());
    }

    #[test]
    fn rejects_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(&path, "version: 9\nmodel: openai:gpt-4o\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
