use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{QuarryError, Result, ValidationError};
use crate::ranking::ranker_by_name;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    ///
    /// Every check runs; all failures are reported together.
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_text(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_rag(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(QuarryError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }
    }

    fn validate_text(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.text.min_term_length == 0 {
            errors.push(ValidationError::new(
                "text.min_term_length",
                "Minimum term length must be greater than 0",
            ));
        }

        if let Some(word) = config
            .text
            .extra_stop_words
            .iter()
            .find(|w| w.trim().is_empty())
        {
            errors.push(ValidationError::new(
                "text.extra_stop_words",
                format!("Stop words cannot be blank, got {:?}", word),
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let k = config.search.rrf_k;
        if !k.is_finite() || k <= 0.0 {
            errors.push(ValidationError::new(
                "search.rrf_k",
                format!("RRF constant must be positive, got {}", k),
            ));
        }

        if config.search.default_limit == 0 {
            errors.push(ValidationError::new(
                "search.default_limit",
                "Default limit must be greater than 0",
            ));
        }

        if ranker_by_name(&config.search.ranker).is_none() {
            errors.push(ValidationError::new(
                "search.ranker",
                format!("Unknown ranker '{}', expected 'tfidf'", config.search.ranker),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.max_words == 0 {
            errors.push(ValidationError::new(
                "embedding.max_words",
                "Word limit must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        // If LLM is enabled, validate API key environment variable is set
        if config.llm.enabled {
            let env_var = &config.llm.api_key_env;
            if let Ok(key) = std::env::var(env_var) {
                if key.is_empty() {
                    errors.push(ValidationError::new(
                        "llm.api_key_env",
                        format!("Environment variable {} is empty", env_var),
                    ));
                }
            } else {
                errors.push(ValidationError::new(
                    "llm.api_key_env",
                    format!("Environment variable {} is not set", env_var),
                ));
            }
        }

        let endpoint = &config.llm.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(ValidationError::new(
                "llm.endpoint",
                format!("Endpoint must be an http(s) URL, got '{}'", endpoint),
            ));
        }

        // Validate temperature range
        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_rag(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.rag.top_k == 0 {
            errors.push(ValidationError::new(
                "rag.top_k",
                "top_k must be greater than 0",
            ));
        }

        if config.rag.max_words_per_doc == 0 {
            errors.push(ValidationError::new(
                "rag.max_words_per_doc",
                "Word limit must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(QuarryError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_ranker() {
        let mut config = Config::default();
        config.search.ranker = "bm25".to_string();
        assert_eq!(error_paths(&config), vec!["search.ranker"]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.search.rrf_k = 0.0;
        config.rag.top_k = 0;
        config.llm.temperature = 3.0;
        config.text.min_term_length = 0;

        let paths = error_paths(&config);
        assert_eq!(paths.len(), 4);
        for expected in ["search.rrf_k", "rag.top_k", "llm.temperature", "text.min_term_length"] {
            assert!(paths.iter().any(|p| p == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_enabled_llm_requires_api_key() {
        let mut config = Config::default();
        config.llm.enabled = true;
        config.llm.api_key_env = "QUARRY_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert_eq!(error_paths(&config), vec!["llm.api_key_env"]);
    }
}
