// src/agent/code_builder.rs

use crate::agent::{DETERMINISTIC, prompts};
use crate::context::Context;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::model::{CandidateProgram, ParsedProblem};
use crate::protocol::strip_code_fences;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Generates a runnable script from a parsed problem and its full text.
pub struct CodeBuilder {
    llm: Arc<dyn TextGenerator>,
}

impl CodeBuilder {
    pub fn new(context: &Context) -> Self {
        Self {
            llm: context.generator(),
        }
    }

    /// `None` means no candidate was produced for this attempt.
    pub fn build(&self, problem: &ParsedProblem) -> Option<CandidateProgram> {
        let payload = match serde_json::to_string(problem) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize parsed problem: {e}");
                return None;
            }
        };
        info!(degraded = problem.is_degraded(), "Building code from parsed data");

        let request = GenerationRequest::new(prompts::build_code(&payload)).temperature(DETERMINISTIC);
        let reply = match self.llm.complete(&request) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Code generation failed: {e}");
                return None;
            }
        };

        let program = CandidateProgram::new(strip_code_fences(&reply));
        if program.is_blank() {
            warn!("Code generation returned no script");
            return None;
        }
        debug!("Generated code:\n{}", program.as_str());
        Some(program)
    }
}
