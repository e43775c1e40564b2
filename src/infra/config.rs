// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::ConvoGenError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used to generate conversation transcripts.
    pub generator: Option<String>,
    /// Model used to score transcripts. Falls back to the generator model.
    pub evaluator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub min_per_day: u32,
    pub max_per_day: u32,
    pub similarity_threshold: f32,
    pub min_turns: u8,
    pub max_turns: u8,
    pub max_duplicate_retries: u32,
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_per_day: 3,
            max_per_day: 8,
            similarity_threshold: 0.8,
            min_turns: 6,
            max_turns: 14,
            max_duplicate_retries: 5,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
        }
    }
}

impl Config {
    /// Load from `~/.convogen/config.toml`, falling back to defaults if absent.
    pub fn load() -> Result<Self, ConvoGenError> {
        let path = config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConvoGenError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ConvoGenError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Path to the user config file.
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".convogen")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.pipeline.min_per_day, 3);
        assert_eq!(cfg.pipeline.max_per_day, 8);
        assert!((cfg.pipeline.similarity_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(cfg.pipeline.max_duplicate_retries, 5);
        assert_eq!(cfg.pipeline.request_timeout_secs, 120);
        assert!(cfg.models.generator.is_none());
        assert_eq!(cfg.api.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [models]
            generator = "gpt-4.1-mini"

            [pipeline]
            min_per_day = 1
            max_per_day = 2
            similarity_threshold = 0.9
            min_turns = 4
            max_turns = 10
            max_duplicate_retries = 3
            request_timeout_secs = 30
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.models.generator.as_deref(), Some("gpt-4.1-mini"));
        assert!(cfg.models.evaluator.is_none());
        assert_eq!(cfg.pipeline.min_per_day, 1);
        assert_eq!(cfg.pipeline.max_per_day, 2);
        // [api] section omitted entirely, defaults apply
        assert_eq!(cfg.api.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.pipeline.min_turns, 6);
        assert_eq!(cfg.pipeline.max_turns, 14);
    }
}
