//! Generation provider — Gemini via rig-core.
//!
//! The pipeline depends only on the [`TextGenerator`] trait: one prompt in,
//! one block of text out. Tests substitute fakes; the real implementation
//! is a rig agent over the Gemini API.

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::gemini;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Configuration for creating a generator.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Single-turn text generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue one generation request. Output is opaque, possibly empty text;
    /// callers decide what an empty result means.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Create a Gemini-backed generator from configuration.
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let client = gemini::Client::new(config.api_key.expose_secret()).map_err(|e| {
        LlmError::RequestFailed {
            provider: "gemini".to_string(),
            reason: format!("Failed to create Gemini client: {e}"),
        }
    })?;

    let agent = client.agent(&config.model).build();
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(GeminiGenerator {
        agent,
        model: config.model.clone(),
    }))
}

/// Gemini generator backed by a rig agent.
pub struct GeminiGenerator {
    agent: rig::agent::Agent<gemini::completion::CompletionModel>,
    model: String,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.agent
            .prompt(prompt)
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: e.to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
