// src/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single call to the text-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response missing '{0}' field")]
    MissingField(&'static str),
    #[error("provider returned an empty reply")]
    EmptyReply,
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
    #[error("generator unavailable: {0}")]
    Unavailable(String),
}

/// A model reply that could not be decoded into the shape a stage expects.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no JSON object found in reply")]
    NoJson,
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("simulation request is empty")]
    EmptyRequest,
}
