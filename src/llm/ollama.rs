// src/llm/ollama.rs

use crate::error::GenerationError;
use crate::llm::{GenerationRequest, TextGenerator};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Sends prompts to a local Ollama server.
pub struct OllamaClient {
    pub model: String,
    endpoint: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// `None` leaves the call unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, GenerationError> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn payload(&self, request: &GenerationRequest) -> Value {
        let mut payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": { "temperature": request.temperature }
        });
        if let Some(schema) = &request.schema_hint {
            payload["format"] = schema.clone();
        }
        payload
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new("llama3")
    }
}

impl TextGenerator for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.endpoint);
        let response = self.client.post(url).json(&self.payload(request)).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let json = response.json::<Value>()?;
        let text = json
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or(GenerationError::MissingField("response"))?
            .trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        Ok(text.to_string())
    }
}
