// src/agent/report.rs

use crate::agent::{DETERMINISTIC, prompts};
use crate::context::Context;
use crate::error::GenerationError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::model::CandidateProgram;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_REPORT_PATH: &str = "simulation_report.txt";

/// Writes a student-facing explanation of a finished simulation script.
pub struct InsightReporter {
    llm: Arc<dyn TextGenerator>,
    report_path: PathBuf,
}

impl InsightReporter {
    pub fn new(context: &Context, report_path: impl Into<PathBuf>) -> Self {
        Self {
            llm: context.generator(),
            report_path: report_path.into(),
        }
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Generates the report in `language` and overwrites the report file.
    /// Saving is best-effort; only generation failures are returned.
    pub fn generate(
        &self,
        program: &CandidateProgram,
        language: &str,
    ) -> Result<String, GenerationError> {
        info!(language, "Generating report from the simulation code");
        let request = GenerationRequest::new(prompts::insight_report(program.as_str(), language))
            .temperature(DETERMINISTIC);
        let report = self
            .llm
            .complete(&request)
            .inspect_err(|e| error!("Failed to generate report: {e}"))?
            .trim()
            .to_string();

        match fs::write(&self.report_path, &report) {
            Ok(()) => info!("Report saved to {}", self.report_path.display()),
            Err(e) => error!("Failed to save report to {}: {e}", self.report_path.display()),
        }
        Ok(report)
    }
}
