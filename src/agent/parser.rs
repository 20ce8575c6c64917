// src/agent/parser.rs

use crate::agent::{DETERMINISTIC, prompts};
use crate::context::Context;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::memory::AuditTrail;
use crate::model::{ClarifiedSpec, ParsedProblem, ProblemRecord};
use crate::protocol::decode_json;
use crate::validation::validate_record;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Decomposes a clarified specification into a `ProblemRecord`.
pub struct Parser {
    llm: Arc<dyn TextGenerator>,
    audit: AuditTrail,
}

impl Parser {
    pub fn new(context: &Context) -> Self {
        Self {
            llm: context.generator(),
            audit: context.audit().clone(),
        }
    }

    /// Always keeps `spec` as `full_text`; degrades to a `fallback_text`
    /// record when the reply is missing or malformed.
    pub fn parse(&self, spec: &ClarifiedSpec) -> ParsedProblem {
        info!("Parsing clarified input");
        debug!("Clarified input: {spec}");
        let request = GenerationRequest::new(prompts::parse(spec.as_str()))
            .temperature(DETERMINISTIC)
            .schema(prompts::problem_schema());

        let problem = match self.llm.complete(&request) {
            Ok(reply) => match decode_json::<ProblemRecord>(&reply) {
                Ok(record) => {
                    for issue in validate_record(&record) {
                        let (msg, maybe_hint) = issue.hint();
                        warn!("Parsed record check: {msg}");
                        if let Some(hint) = maybe_hint {
                            debug!("Hint: {hint}");
                        }
                    }
                    ParsedProblem::structured(record, spec)
                }
                Err(e) => {
                    error!("Parsing failed: {e}");
                    let reply = reply.trim();
                    let best_effort = if reply.is_empty() { spec.as_str() } else { reply };
                    ParsedProblem::fallback(best_effort, spec)
                }
            },
            Err(e) => {
                error!("Parsing failed: {e}");
                ParsedProblem::fallback(spec.as_str(), spec)
            }
        };

        self.audit.record_parse(&problem);
        problem
    }
}
