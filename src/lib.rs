//! WordFlux - batch DOCX translation library
//!
//! Splits DOCX documents into text chunks and dispatches chunk-translation
//! requests to a remote language-model provider under a bounded-concurrency,
//! sliding-window rate-limited execution policy.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod processors;

// Re-export key types for convenience
pub use crate::core::{
    client::ProviderClient,
    config::TranslatorConfig,
    dispatcher::ChunkDispatcher,
    errors::TranslationError,
    limiter::RateLimiter,
    models::{Chunk, ProviderKind},
};

pub use crate::processors::docx::DocxTranslator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
