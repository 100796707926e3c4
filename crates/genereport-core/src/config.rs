//! Configuration loading for genereport.
//! Reads a TOML file; the AI API key may also come from `GENEREPORT_AI_API_KEY`.

use std::path::Path;
use std::time::Duration;

use genereport_llm::{
    GenerationError, OpenAiCompatibleGenerator, OpenAiCompatibleSettings, ReportGenerator,
    UnconfiguredGenerator,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{FilesystemStore, HttpObjectStore, MemoryStore, ObjectStore, StorageError};

pub const API_KEY_ENV: &str = "GENEREPORT_AI_API_KEY";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("AI backend setup failed: {0}")]
    Generator(#[from] GenerationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

fn default_db_path() -> String { "genereport.db".to_string() }

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Filesystem,
    Http,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Base URL for the HTTP backend
    pub endpoint: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            root: default_storage_root(),
            endpoint: None,
            bucket: default_bucket(),
            timeout_secs: default_storage_timeout(),
        }
    }
}

fn default_storage_backend() -> StorageBackend { StorageBackend::Filesystem }
fn default_storage_root()    -> String { "blobs".to_string() }
fn default_bucket()          -> String { "genereport".to_string() }
fn default_storage_timeout() -> u64 { 30 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenAI-compatible base URL; unset means generation is disabled
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: default_model(),
            timeout_secs: default_ai_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_model()       -> String { "gpt-4o-mini".to_string() }
fn default_ai_timeout()  -> u64 { 120 }
fn default_max_tokens()  -> u32 { 2048 }
fn default_temperature() -> f32 { 0.2 }

/// What the extractor does with data lines that have fewer than five fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortLinePolicy {
    /// Drop the line and log a warning
    #[default]
    Skip,
    /// Fail the whole extraction
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_max_mutations")]
    pub max_mutations_in_prompt: usize,
    #[serde(default)]
    pub short_line_policy: ShortLinePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_mutations_in_prompt: default_max_mutations(),
            short_line_policy: ShortLinePolicy::default(),
        }
    }
}

fn default_max_mutations() -> usize { 50 }

impl Config {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse from TOML text, then apply environment overrides.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let mut config: Config = toml::from_str(text)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.ai.api_key = Some(key);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.pipeline.max_mutations_in_prompt == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.max_mutations_in_prompt must be at least 1".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Http && self.storage.endpoint.is_none() {
            return Err(ConfigError::Invalid(
                "storage.endpoint is required for the http backend".into(),
            ));
        }
        Ok(())
    }

    /// Build the configured object store.
    pub fn build_store(&self) -> ConfigResult<Box<dyn ObjectStore>> {
        let timeout = Duration::from_secs(self.storage.timeout_secs);
        let store: Box<dyn ObjectStore> = match self.storage.backend {
            StorageBackend::Filesystem => Box::new(FilesystemStore::new(&self.storage.root)?),
            StorageBackend::Http => {
                let endpoint = self.storage.endpoint.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("storage.endpoint is required for the http backend".into())
                })?;
                Box::new(HttpObjectStore::new(endpoint, &self.storage.bucket, timeout)?)
            }
            StorageBackend::Memory => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }

    /// Build the configured AI backend. Without an endpoint the backend
    /// reports itself unconfigured.
    pub fn build_generator(&self) -> ConfigResult<Box<dyn ReportGenerator>> {
        let Some(endpoint) = self.ai.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(Box::new(UnconfiguredGenerator));
        };
        let generator = OpenAiCompatibleGenerator::new(OpenAiCompatibleSettings {
            base_url: endpoint.to_string(),
            api_key: self.ai.api_key.clone(),
            model: self.ai.model.clone(),
            timeout: Duration::from_secs(self.ai.timeout_secs),
            max_tokens: self.ai.max_tokens,
            temperature: self.ai.temperature,
        })?;
        Ok(Box::new(generator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.database.path, "genereport.db");
        assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        assert_eq!(config.pipeline.max_mutations_in_prompt, 50);
        assert_eq!(config.pipeline.short_line_policy, ShortLinePolicy::Skip);
        assert!(config.ai.endpoint.is_none());
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            [database]
            path = "/var/lib/genereport/app.db"

            [storage]
            backend = "http"
            endpoint = "http://minio:9000"
            bucket = "lab"
            timeout_secs = 10

            [ai]
            endpoint = "http://localhost:11434"
            model = "llama3:8b"
            timeout_secs = 60

            [pipeline]
            max_mutations_in_prompt = 20
            short_line_policy = "reject"
        "#;
        let config = Config::from_toml(text).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Http);
        assert_eq!(config.storage.bucket, "lab");
        assert_eq!(config.ai.model, "llama3:8b");
        assert_eq!(config.ai.max_tokens, 2048);
        assert_eq!(config.pipeline.max_mutations_in_prompt, 20);
        assert_eq!(config.pipeline.short_line_policy, ShortLinePolicy::Reject);
    }

    #[test]
    fn test_http_backend_requires_endpoint() {
        let result = Config::from_toml("[storage]\nbackend = \"http\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_mutation_limit_rejected() {
        let result = Config::from_toml("[pipeline]\nmax_mutations_in_prompt = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_generator_without_endpoint_is_unconfigured() {
        let config = Config::default();
        let generator = config.build_generator().unwrap();
        assert!(!generator.is_configured());
    }

    #[test]
    fn test_generator_with_endpoint() {
        let mut config = Config::default();
        config.ai.endpoint = Some("http://localhost:11434".into());
        let generator = config.build_generator().unwrap();
        assert!(generator.is_configured());
        assert_eq!(generator.model_identifier(), "gpt-4o-mini");
    }

    #[test]
    fn test_memory_store() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        let store = config.build_store().unwrap();
        assert!(store.put("k", b"v").is_ok());
    }
}
