// src/agent/diagnoser.rs

use crate::agent::{DETERMINISTIC, prompts};
use crate::context::Context;
use crate::error::DecodeError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::memory::{AuditTrail, ErrorRecord};
use crate::protocol::{
    Diagnosis, DiagnosisReport, FixType, decode_json, strip_code_fences, text_from_json,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Stands in for captured output when a run printed nothing.
pub const NO_OUTPUT_PLACEHOLDER: &str =
    "[No output detected. The code may have failed to execute properly.]";

const DEFAULT_CONFIDENCE: f64 = 0.5;

#[derive(Deserialize)]
struct DiagnosisReply {
    fix_type: FixType,
    after_code: String,
    #[serde(default, deserialize_with = "text_from_json")]
    hint: String,
    #[serde(default, deserialize_with = "lenient_confidence")]
    confidence: Option<f64>,
    #[serde(default)]
    diagnoses: Value,
}

/// Accepts a number or a numeric string; anything else counts as absent.
fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Keeps the entries that decode; a bare string becomes an unlocated hint.
fn lenient_diagnoses(raw: Value) -> Vec<Diagnosis> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(hint) => Some(Diagnosis::new("unknown", &hint)),
            other => serde_json::from_value(other).ok(),
        })
        .collect()
}

/// Explains a failed run and proposes either patched code or a re-parse.
pub struct Diagnoser {
    llm: Arc<dyn TextGenerator>,
    audit: AuditTrail,
}

impl Diagnoser {
    pub fn new(context: &Context) -> Self {
        Self {
            llm: context.generator(),
            audit: context.audit().clone(),
        }
    }

    /// Total: any failure returns a zero-confidence report whose `after_code`
    /// is `code` unchanged.
    pub fn diagnose(&self, error_signal: &str, code: &str, output: &str) -> DiagnosisReport {
        info!("Starting error diagnosis");
        self.audit
            .record_error(&ErrorRecord::now(error_signal, code, output));

        let output = if output.trim().is_empty() {
            warn!("Simulation output is empty; inserted placeholder message");
            NO_OUTPUT_PLACEHOLDER
        } else {
            output
        };

        let prompt = prompts::diagnose(error_signal, output, code);
        self.audit.record_prompt(&prompt);
        let request = GenerationRequest::new(prompt)
            .temperature(DETERMINISTIC)
            .schema(prompts::diagnosis_schema());

        let reply = match self.llm.complete(&request) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error diagnosis failed: {e}");
                return DiagnosisReport::no_fix(code, &e.to_string());
            }
        };

        match interpret(&reply, code) {
            Ok(report) => {
                info!(
                    fix_type = ?report.fix_type,
                    confidence = report.confidence,
                    changed = !report.is_no_op(),
                    "Diagnosis complete"
                );
                debug!("Diagnosis hint: {}", report.hint);
                report
            }
            Err(e) => {
                error!("Error diagnosis failed: {e}");
                DiagnosisReport::no_fix(code, &e.to_string())
            }
        }
    }
}

fn interpret(reply: &str, code: &str) -> Result<DiagnosisReport, DecodeError> {
    let reply: DiagnosisReply = decode_json(reply)?;
    let after_code = strip_code_fences(&reply.after_code);
    if reply.fix_type == FixType::Code && after_code.trim().is_empty() {
        return Err(DecodeError::Invalid("code fix with empty after_code".into()));
    }

    let confidence = match reply.confidence {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    };
    let mut diagnoses = lenient_diagnoses(reply.diagnoses);
    if diagnoses.is_empty() {
        diagnoses.push(Diagnosis::new("unknown", "Automatically diagnosed."));
    }

    Ok(DiagnosisReport {
        fix_type: reply.fix_type,
        hint: reply.hint,
        before_code: code.to_string(),
        after_code,
        confidence,
        diagnoses,
    })
}
