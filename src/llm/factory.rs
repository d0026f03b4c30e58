//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{InquireError, Result};
use crate::llm::ollama::DEFAULT_OLLAMA_MODEL;
use crate::llm::openai::DEFAULT_OPENAI_MODEL;
use crate::llm::{
    GenerationOptions, LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig,
    OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client for the configured provider.
///
/// The model is resolved in order:
/// 1. `config.model`
/// 2. Environment variable (`OLLAMA_MODEL` or `OPENAI_MODEL`)
/// 3. Provider default (`llama3:8b` or `gpt-4o`)
///
/// OpenAI additionally requires `OPENAI_API_KEY`.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let options = GenerationOptions::from(config);

    match config.provider {
        LlmProvider::Ollama => {
            let mut ollama = OllamaConfig::from_env()
                .with_timeout(config.timeout_secs)
                .with_options(options);
            if let Some(model) = &config.model {
                ollama.model = model.clone();
            }
            Ok(Arc::new(OllamaClient::new(ollama)?))
        }
        LlmProvider::OpenAi => {
            let key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| InquireError::llm("No API key configured. Set OPENAI_API_KEY."))?;
            let model = resolve_model(config, "OPENAI_MODEL", DEFAULT_OPENAI_MODEL);
            let openai = OpenAiConfig::new(key, model)
                .with_timeout(config.timeout_secs)
                .with_options(options);
            Ok(Arc::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}

/// Returns the model name the configured provider will use.
pub fn model_name(config: &LlmConfig) -> String {
    match config.provider {
        LlmProvider::Ollama => resolve_model(config, "OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
        LlmProvider::OpenAi => resolve_model(config, "OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
        LlmProvider::Mock => "mock".to_string(),
    }
}

fn resolve_model(config: &LlmConfig, env_var: &str, default: &str) -> String {
    config
        .model
        .clone()
        .or_else(|| std::env::var(env_var).ok())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_create_mock_client() {
        assert!(create_client(&config(LlmProvider::Mock)).is_ok());
        assert_eq!(model_name(&config(LlmProvider::Mock)), "mock");
    }

    #[test]
    fn test_create_ollama_client() {
        assert!(create_client(&config(LlmProvider::Ollama)).is_ok());
    }

    #[test]
    fn test_configured_model_wins() {
        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            model: Some("sqlcoder:7b".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(model_name(&config), "sqlcoder:7b");
    }

    #[test]
    fn test_create_openai_without_key_fails() {
        // Temporarily unset the env var if it exists
        let original = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let result = create_client(&config(LlmProvider::OpenAi));
        let err = result.err().unwrap();
        assert!(err.to_string().contains("No API key configured"));

        // Restore
        if let Some(key) = original {
            std::env::set_var("OPENAI_API_KEY", key);
        }
    }
}
