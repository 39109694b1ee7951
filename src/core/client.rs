//! Provider client abstraction over the translation backends

use std::time::Duration;
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::ProviderKind;

/// Default endpoint for the OpenAI-compatible provider
const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Endpoint template for the Gemini provider
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One authenticated session with a translation backend.
///
/// Constructed once per run and shared read-only by all workers; calls are
/// stateless beyond network I/O. Both backends are normalized behind a
/// single `translate` operation - adding a provider means adding a
/// [`ProviderKind`] variant and a request builder, not touching callers.
/// Retries are the dispatcher's concern, not this client's.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    source_lang: String,
    target_lang: String,
}

impl ProviderClient {
    /// Create a client from the run configuration.
    ///
    /// Fails fast with a `ConfigError` when no API key is resolvable.
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let api_key = config.api_key()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let base_url = match config.provider {
            ProviderKind::OpenAi => config
                .openai_api_base_url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string()),
            ProviderKind::Gemini => GEMINI_BASE_URL.to_string(),
        };

        Ok(Self {
            http,
            kind: config.provider,
            api_key,
            model: config.model.clone(),
            base_url,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
        })
    }

    /// Translate one chunk of text, returning the generated translation.
    pub async fn translate(&self, text: &str) -> Result<String> {
        let prompt = self.build_prompt(text);
        match self.kind {
            ProviderKind::OpenAi => self.generate_openai(&prompt).await,
            ProviderKind::Gemini => self.generate_gemini(&prompt).await,
        }
    }

    fn build_prompt(&self, text: &str) -> String {
        let source = if self.source_lang == "auto" {
            "the source language".to_string()
        } else {
            self.source_lang.clone()
        };
        format!(
            "Translate the following text from {} to {}. \
             Preserve the original meaning, tone and formatting. \
             Output only the translation, without explanations.\n\n{}",
            source, self.target_lang, text
        )
    }

    async fn generate_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });

        debug!("POST {} (model: {})", url, self.model);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| TranslationError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TranslationError::InvalidResponseError {
                message: "no translation in response".to_string(),
            })
    }

    async fn generate_gemini(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        debug!("POST {} (model: {})", url, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| TranslationError::InvalidResponseError {
                    message: e.to_string(),
                })?;

        json["candidates"]
            .get(0)
            .and_then(|c| c["content"]["parts"].get(0))
            .and_then(|p| p["text"].as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TranslationError::InvalidResponseError {
                message: "no translation in response".to_string(),
            })
    }
}
