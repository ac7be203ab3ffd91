//! Configuration management for Quarry
//!
//! Loads the TOML configuration, applies profile and environment overrides
//! and validates the result before anything else reads it.

use crate::error::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Supported configuration schema
pub const SCHEMA_VERSION: &str = "1.0.0";

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE: &str = "quarry.db";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub text: TextConfig,
    pub search: SearchConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the database; `~/` is expanded
    pub data_dir: PathBuf,
    /// Document content of at least this many bytes is stored compressed
    pub compression_threshold: usize,
}

impl StorageConfig {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(expand_path(&self.data_dir)?.join(DATABASE_FILE))
    }
}

/// Tokenization settings shared by indexing and query parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    /// Stop words in addition to the built-in English list
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
    pub min_term_length: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            extra_stop_words: Vec::new(),
            min_term_length: 2,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Reciprocal Rank Fusion constant
    pub rrf_k: f64,
    pub default_limit: usize,
    /// Maximum snippets printed per query term
    pub snippets_per_term: usize,
    /// Keyword ranker ("tfidf")
    pub ranker: String,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    pub model: String,
    /// Input is truncated to this many words before embedding
    pub max_words: usize,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Retrieval-augmented answering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Documents passed to the LLM
    pub top_k: usize,
    pub max_words_per_doc: usize,
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_top_k: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuarryError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| QuarryError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| QuarryError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| QuarryError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(enabled) = overrides.embedding_enabled {
            self.embedding.enabled = enabled;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(top_k) = overrides.rag_top_k {
            self.rag.top_k = top_k;
        }
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: QUARRY_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("QUARRY_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            "SEARCH__RRF_K" => self.search.rrf_k = parse_value(path, value)?,
            "SEARCH__DEFAULT_LIMIT" => self.search.default_limit = parse_value(path, value)?,
            "EMBEDDING__ENABLED" => self.embedding.enabled = parse_value(path, value)?,
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "LLM__ENABLED" => self.llm.enabled = parse_value(path, value)?,
            "LLM__ENDPOINT" => self.llm.endpoint = value.to_string(),
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__TIMEOUT_SECS" => self.llm.timeout_secs = parse_value(path, value)?,
            "RAG__TOP_K" => self.rag.top_k = parse_value(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| QuarryError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("quarry").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| QuarryError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".quarry"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| QuarryError::InvalidConfigValue {
        path: path.to_string(),
        message: format!(
            "Cannot parse '{}' as {}",
            value,
            std::any::type_name::<T>()
        ),
    })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| QuarryError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| QuarryError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.quarry"),
                compression_threshold: 4096,
            },
            text: TextConfig::default(),
            search: SearchConfig {
                rrf_k: 60.0,
                default_limit: 10,
                snippets_per_term: 3,
                ranker: "tfidf".to_string(),
            },
            embedding: EmbeddingConfig {
                enabled: true,
                model: "all-MiniLM-L6-v2".to_string(),
                max_words: 1500,
            },
            llm: LlmConfig {
                enabled: false,
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                api_key_env: "GROQ_API_KEY".to_string(),
                model: "llama-3.1-70b-versatile".to_string(),
                temperature: 0.1,
                timeout_secs: 120,
            },
            rag: RagConfig {
                top_k: 5,
                max_words_per_doc: 3000,
            },
            profiles: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.search.default_limit = 25;
        config.text.extra_stop_words = vec!["lorem".to_string()];
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.search.default_limit, 25);
        assert_eq!(loaded.text.extra_stop_words, vec!["lorem".to_string()]);
        assert_eq!(loaded.rag.top_k, 5);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load(Path::new("/nonexistent/quarry/config.toml"));
        assert!(matches!(result, Err(QuarryError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_text_section_is_optional() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut value = toml::Value::try_from(Config::default()).unwrap();
        value.as_table_mut().unwrap().remove("text");
        std::fs::write(&path, toml::to_string(&value).unwrap()).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.text.min_term_length, 2);
    }

    #[test]
    fn test_apply_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "offline".to_string(),
            ProfileOverrides {
                embedding_enabled: Some(false),
                rag_top_k: Some(2),
                ..Default::default()
            },
        );

        config.apply_profile("offline").unwrap();
        assert!(!config.embedding.enabled);
        assert_eq!(config.rag.top_k, 2);
        assert!(config.apply_profile("missing").is_err());
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config.set_value_from_env("EMBEDDING__ENABLED", "false").unwrap();
        config.set_value_from_env("SEARCH__RRF_K", "30").unwrap();
        config.set_value_from_env("UNKNOWN__KEY", "x").unwrap();

        assert!(!config.embedding.enabled);
        assert_eq!(config.search.rrf_k, 30.0);
        assert!(config.set_value_from_env("RAG__TOP_K", "many").is_err());
    }

    #[test]
    fn test_expand_path() {
        let absolute = Path::new("/var/lib/quarry");
        assert_eq!(expand_path(absolute).unwrap(), absolute);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path(Path::new("~/data")).unwrap(), home.join("data"));
        }
    }

    #[test]
    fn test_database_path() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/tmp/quarry-data"),
            compression_threshold: 0,
        };
        assert_eq!(
            storage.database_path().unwrap(),
            PathBuf::from("/tmp/quarry-data/quarry.db")
        );
    }
}
