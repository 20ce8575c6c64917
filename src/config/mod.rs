// src/config/mod.rs

use crate::agent::report::DEFAULT_REPORT_PATH;
use crate::error::ConfigError;
use crate::executor::{DEFAULT_INTERPRETER, DEFAULT_SCRIPT_PATH, Executor, SignatureClassifier};
use crate::memory::AuditTrail;
use crate::orchestrator::{DEFAULT_MAX_ITERATIONS, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    /// Provider default when unset.
    pub endpoint: Option<String>,
    pub api_key_env: String,
    /// Unbounded when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: "llama3".into(),
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_secs: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub interpreter: String,
    pub script_path: PathBuf,
    /// Failure markers scanned for in addition to the built-in set.
    pub extra_signatures: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.into(),
            script_path: DEFAULT_SCRIPT_PATH.into(),
            extra_signatures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub dir: PathBuf,
    pub parsed_json: String,
    pub parsed_text: String,
    pub error_log: String,
    pub prompt_log: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            parsed_json: "parsed_results.jsonl".into(),
            parsed_text: "parsed_results.txt".into(),
            error_log: "error_logs.txt".into(),
            prompt_log: "last_prompt.txt".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub max_iterations: u32,
    pub report_language: String,
    pub report_path: PathBuf,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            report_language: "English".into(),
            report_path: DEFAULT_REPORT_PATH.into(),
        }
    }
}

/// Everything the binary needs to wire a pipeline, read from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub llm: LlmConfig,
    pub executor: ExecutorConfig,
    pub audit: AuditConfig,
    pub pipeline: LoopConfig,
}

impl PipelineConfig {
    /// Reads the file as the first override layer. Values are not validated
    /// until [`validate`](Self::validate) runs after the remaining layers.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `AGENTIC_FEM_*` overrides from `lookup` (normally `std::env::var`).
    /// Only malformed numbers fail here; call [`validate`](Self::validate) once
    /// every override layer has been applied.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("AGENTIC_FEM_MODEL") {
            self.llm.model = model;
        }
        if let Some(interpreter) = lookup("AGENTIC_FEM_INTERPRETER") {
            self.executor.interpreter = interpreter;
        }
        if let Some(raw) = lookup("AGENTIC_FEM_MAX_ITERATIONS") {
            self.pipeline.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("AGENTIC_FEM_MAX_ITERATIONS is not a number: {raw}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.max_iterations must be at least 1".into(),
            ));
        }
        if self.executor.interpreter.trim().is_empty() {
            return Err(ConfigError::Invalid("executor.interpreter is empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model is empty".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.pipeline.max_iterations)
    }

    pub fn executor(&self) -> Result<Executor, ConfigError> {
        let executor = Executor::new(&self.executor.interpreter, self.executor.script_path.clone());
        if self.executor.extra_signatures.is_empty() {
            return Ok(executor);
        }
        let classifier = SignatureClassifier::with_extra_signatures(
            self.executor.extra_signatures.iter().map(String::as_str),
        )
        .map_err(|e| ConfigError::Invalid(format!("executor.extra_signatures: {e}")))?;
        Ok(executor.with_classifier(classifier))
    }

    pub fn audit_trail(&self) -> AuditTrail {
        AuditTrail::in_dir(
            &self.audit.dir,
            &self.audit.parsed_json,
            &self.audit.parsed_text,
            &self.audit.error_log,
            &self.audit.prompt_log,
        )
    }
}
