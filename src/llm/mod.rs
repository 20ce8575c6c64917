// src/llm/mod.rs

use crate::config::{LlmConfig, Provider};
use crate::error::GenerationError;
use serde_json::Value;
use std::sync::Arc;

pub mod fake;
pub mod ollama;
pub mod openai;

pub use fake::ScriptedGenerator;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// One call to the text-generation service.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    /// JSON schema the reply should follow, when the stage expects structure.
    pub schema_hint: Option<Value>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            schema_hint: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema_hint = Some(schema);
        self
    }
}

/// The opaque `generate(prompt) -> text` capability every stage depends on.
///
/// Implementations differ only in transport and credentials; replies are
/// non-deterministic and may arrive wrapped in markdown.
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

/// Builds the configured provider client.
pub fn connect(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    let timeout = config.timeout();
    match config.provider {
        Provider::Ollama => {
            let mut client = OllamaClient::new(&config.model);
            if let Some(endpoint) = &config.endpoint {
                client = client.with_endpoint(endpoint);
            }
            Ok(Arc::new(client.with_timeout(timeout)?))
        }
        Provider::OpenAi => {
            let key = std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| GenerationError::MissingApiKey(config.api_key_env.clone()))?;
            let mut client = OpenAiClient::new(&config.model, &key);
            if let Some(endpoint) = &config.endpoint {
                client = client.with_endpoint(endpoint);
            }
            Ok(Arc::new(client.with_timeout(timeout)?))
        }
    }
}
