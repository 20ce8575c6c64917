// src/llm/openai.rs

use crate::error::GenerationError;
use crate::llm::{GenerationRequest, TextGenerator};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    pub model: String,
    endpoint: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(model: &str, api_key: &str) -> Self {
        Self {
            model: model.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, GenerationError> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            response_format: request.schema_hint.as_ref().map(|_| ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

impl TextGenerator for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.body(request))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let chat = response.json::<ChatResponse>()?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::MissingField("choices[0].message.content"))?;
        let content = content.trim();
        if content.is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        Ok(content.to_string())
    }
}
