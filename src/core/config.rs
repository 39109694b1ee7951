//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::ProviderKind;

/// Run configuration, loaded once from YAML and immutable for the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub provider: ProviderKind,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub source_lang: String,
    pub target_lang: String,
    pub max_chunk_size: usize,
    pub max_concurrent: usize,
    pub openai_api_base_url: Option<String>,
    /// Requests per minute, 0 = unlimited
    pub rpm_limit: u32,
    /// Tokens per minute, 0 = unlimited
    pub tpm_limit: u64,
    pub timeout_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            openai_api_key: None,
            gemini_api_key: None,
            model: "gpt-4o-mini".to_string(),
            source_lang: "auto".to_string(),
            target_lang: "en".to_string(),
            max_chunk_size: 3000,
            max_concurrent: 5,
            openai_api_base_url: None,
            rpm_limit: 0,
            tpm_limit: 0,
            timeout_ms: 60000,
        }
    }
}

impl TranslatorConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| TranslationError::ConfigError {
                message: format!("cannot read {}: {}", path.display(), e),
            })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve the API key for the configured provider.
    ///
    /// The Gemini provider prefers `gemini_api_key` but falls back to
    /// `openai_api_key` when only the generic key is set. Environment
    /// variables (`OPENAI_API_KEY`, `GEMINI_API_KEY`) fill in for keys
    /// missing from the file.
    pub fn api_key(&self) -> Result<String> {
        let from_env = |var: &str| std::env::var(var).ok().filter(|k| !k.is_empty());

        let key = match self.provider {
            ProviderKind::Gemini => self
                .gemini_api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| from_env("GEMINI_API_KEY"))
                .or_else(|| self.openai_api_key.clone().filter(|k| !k.is_empty())),
            ProviderKind::OpenAi => self
                .openai_api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| from_env("OPENAI_API_KEY")),
        };

        key.ok_or_else(|| TranslationError::ConfigError {
            message: format!("API key not found for provider {}", self.provider),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.is_empty() {
            return Err(TranslationError::ConfigError {
                message: "model is required".to_string(),
            });
        }

        if self.max_concurrent == 0 {
            return Err(TranslationError::ConfigError {
                message: "max_concurrent must be greater than 0".to_string(),
            });
        }

        if self.max_chunk_size == 0 {
            return Err(TranslationError::ConfigError {
                message: "max_chunk_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TranslatorConfig::default();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.rpm_limit, 0);
        assert_eq!(config.tpm_limit, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_zero_concurrency() {
        let config = TranslatorConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_resolution() {
        let config = TranslatorConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(config.api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_gemini_falls_back_to_generic_key() {
        let config = TranslatorConfig {
            provider: ProviderKind::Gemini,
            openai_api_key: Some("generic-key".to_string()),
            gemini_api_key: None,
            ..Default::default()
        };
        assert_eq!(config.api_key().unwrap(), "generic-key");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = TranslatorConfig {
            openai_api_key: Some(String::new()),
            ..Default::default()
        };
        std::env::remove_var("OPENAI_API_KEY");
        assert!(matches!(
            config.api_key(),
            Err(TranslationError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
provider: gemini
gemini_api_key: "g-key"
model: "gemini-2.0-flash"
source_lang: "vi"
target_lang: "en"
max_chunk_size: 2000
max_concurrent: 3
rpm_limit: 15
tpm_limit: 1000000
"#;
        let config: TranslatorConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.rpm_limit, 15);
        assert_eq!(config.tpm_limit, 1_000_000);
        assert_eq!(config.max_concurrent, 3);
        assert!(config.validate().is_ok());
    }
}
