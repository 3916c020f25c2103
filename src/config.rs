//! Engine configuration
//!
//! One TOML file drives every component. Missing sections and fields fall
//! back to defaults, so a partial file is always valid input.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{EngineError, Result};
use crate::ingest::{Chunker, ChunkerConfig, ClassifierConfig, IngestConfig, TierClassifier};
use crate::policy::{AccessPolicy, PolicyConfig};
use crate::providers::ProviderConfig;
use crate::retrieval::RetrievalConfig;
use crate::routing::RouterConfig;

/// Aggregated configuration for the whole engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl EngineConfig {
    /// Load configuration from the default path, creating a default file
    /// if none exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = EngineConfig::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load and validate configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config: EngineConfig = toml::from_str(&contents).map_err(|e| {
            EngineError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("failed to serialize config: {e}")))?;

        fs::write(path, toml_string).map_err(|e| {
            EngineError::Config(format!("failed to write {}: {e}", path.display()))
        })?;

        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("could not determine home directory".to_string()))?;

        Ok(home.join(".lexvault").join("config.toml"))
    }

    /// Checks every section the way its consumer would.
    pub fn validate(&self) -> Result<()> {
        Chunker::from_config(&self.chunker)?;
        TierClassifier::from_config(&self.classifier)?;
        AccessPolicy::from_config(&self.policy)?;
        self.providers.validate()?;
        self.retrieval.validate()?;
        self.ingest.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = EngineConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();
        let back: EngineConfig = toml::from_str(&toml_string).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.chunker.max_chunk_size, config.chunker.max_chunk_size);
        assert_eq!(back.providers.embedding_model, config.providers.embedding_model);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [retrieval]
            default_top_k = 9
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.default_top_k, 9);
        assert_eq!(config.chunker.max_chunk_size, ChunkerConfig::default().max_chunk_size);
    }

    #[test]
    fn test_save_and_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.retrieval.default_top_k = 7;
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.retrieval.default_top_k, 7);
    }

    #[test]
    fn test_invalid_section_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[chunker]\nmax_chunk_size = 100\noverlap_size = 100\n",
        )
        .unwrap();

        let result = EngineConfig::load_from(&path);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
