//! Text-generation integration for db-inquire.
//!
//! Provides the `LlmClient` trait, its provider implementations, and the
//! prompt, extraction and generation-loop logic built on top of it.

pub mod analysis;
pub mod factory;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod service;

pub use analysis::{build_analysis_prompt, ResultAnalyzer, EMPTY_RESULT_ANALYSIS};
pub use factory::{create_client, model_name};
pub use mock::MockLlmClient;
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::extract_sql;
pub use prompt::{ExampleSource, PromptBuilder, Refinement};
pub use service::{QueryGenerator, ValidatedQuery};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::LlmConfig;
use crate::error::Result;

/// Trait for text-generation clients.
///
/// Implementations must be thread-safe (Send + Sync) so one client can serve
/// concurrent requests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends a single prompt and returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Sampling options sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub seed: u64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            seed: 42,
        }
    }
}

impl From<&LlmConfig> for GenerationOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            seed: config.seed,
        }
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama instance
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions API
    OpenAi,
    /// Mock client for testing (no service required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
