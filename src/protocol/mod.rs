// src/protocol/mod.rs

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod reply;

pub use reply::{decode_json, extract_json_object, strip_code_fences};

/// Verdict of a classifier over one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success { output: String },
    Failure { error: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// `None` when the child was killed by a signal or never started.
    pub exit_status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub outcome: Outcome,
}

impl ExecutionResult {
    /// The interpreter could not be launched at all.
    pub fn launch_failure(error: String) -> Self {
        Self {
            exit_status: None,
            stdout: String::new(),
            stderr: error.clone(),
            outcome: Outcome::Failure { error },
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn error_signal(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error } => Some(error),
            Outcome::Success { .. } => None,
        }
    }

    /// Non-empty stdout and stderr joined by a newline.
    pub fn combined_output(&self) -> String {
        join_nonempty(&self.stdout, &self.stderr)
    }
}

pub(crate) fn join_nonempty(first: &str, second: &str) -> String {
    [first, second]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixType {
    /// The structured record was wrong; parse again.
    Parsing,
    /// The program was wrong; run the patched code.
    Code,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(
        default = "unknown_location",
        alias = "error_line",
        alias = "line",
        deserialize_with = "text_from_json"
    )]
    pub location: String,
    #[serde(default, deserialize_with = "text_from_json")]
    pub hint: String,
}

impl Diagnosis {
    pub fn new(location: &str, hint: &str) -> Self {
        Self {
            location: location.into(),
            hint: hint.into(),
        }
    }
}

fn unknown_location() -> String {
    "unknown".into()
}

/// Models report line numbers as numbers or strings; keep either as text.
pub(crate) fn text_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosisReport {
    pub fix_type: FixType,
    pub hint: String,
    pub before_code: String,
    pub after_code: String,
    pub confidence: f64,
    pub diagnoses: Vec<Diagnosis>,
}

impl DiagnosisReport {
    /// Well-formed "no fix" report used whenever diagnosis itself fails.
    pub fn no_fix(code: &str, reason: &str) -> Self {
        Self {
            fix_type: FixType::Code,
            hint: format!("Diagnosis failed: {reason}"),
            before_code: code.to_string(),
            after_code: code.to_string(),
            confidence: 0.0,
            diagnoses: vec![Diagnosis::new("N/A", &format!("Diagnosis failed: {reason}"))],
        }
    }

    /// A code fix that leaves the program untouched.
    pub fn is_no_op(&self) -> bool {
        self.fix_type == FixType::Code && self.after_code == self.before_code
    }
}
