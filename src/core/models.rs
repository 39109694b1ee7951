//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Translation backend provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible REST endpoint (configurable base URL, bearer auth)
    #[default]
    OpenAi,
    /// Google Gemini generateContent endpoint (key-based auth)
    Gemini,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

/// A bounded-size segment of a document's text, translated independently.
///
/// The id is stable and unique within one file and keys the dispatcher's
/// result map, so chunks can be reassembled regardless of completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Estimated token cost of this chunk.
    pub fn estimated_tokens(&self) -> u64 {
        estimate_tokens(&self.text)
    }
}

/// Rough token estimate for quota accounting (~4 chars per token).
///
/// The rate limiter treats this as an opaque caller-supplied cost; exact
/// tokenization is not attempted.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        let openai: ProviderKind = serde_yaml::from_str("openai").unwrap();
        assert_eq!(openai, ProviderKind::OpenAi);

        let gemini: ProviderKind = serde_yaml::from_str("gemini").unwrap();
        assert_eq!(gemini, ProviderKind::Gemini);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_chunk_estimated_tokens() {
        let chunk = Chunk::new(0, "12345678");
        assert_eq!(chunk.estimated_tokens(), 2);
    }
}
