// src/agent/clarifier.rs

use crate::agent::{CLARIFY_TEMPERATURE, prompts};
use crate::context::Context;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::model::{ClarifiedSpec, SimulationRequest};
use crate::protocol::strip_code_fences;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Turns a free-text request into one fully specified paragraph.
pub struct Clarifier {
    llm: Arc<dyn TextGenerator>,
}

impl Clarifier {
    pub fn new(context: &Context) -> Self {
        Self {
            llm: context.generator(),
        }
    }

    /// Never fails: any generation problem returns the request verbatim.
    pub fn clarify(&self, request: &SimulationRequest) -> ClarifiedSpec {
        info!("Clarifying input: {}", request.as_str());
        let prompt = GenerationRequest::new(prompts::clarify(request.as_str()))
            .temperature(CLARIFY_TEMPERATURE);

        match self.llm.complete(&prompt) {
            Ok(reply) => match ClarifiedSpec::new(&strip_code_fences(&reply)) {
                Some(spec) => {
                    debug!("Clarified result: {spec}");
                    spec
                }
                None => {
                    warn!("Clarifier returned an empty paragraph; using the raw request");
                    ClarifiedSpec::verbatim(request)
                }
            },
            Err(e) => {
                error!("Clarification failed: {e}");
                ClarifiedSpec::verbatim(request)
            }
        }
    }
}
