// src/executor/mod.rs

use crate::model::CandidateProgram;
use crate::protocol::ExecutionResult;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info};

pub mod classifier;

pub use classifier::{Classifier, FAILURE_SIGNATURES, SignatureClassifier};

pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_SCRIPT_PATH: &str = "generated_simulation.py";

/// Runs candidate programs in a child interpreter and classifies the result.
///
/// Every attempt overwrites the same script path, so two pipelines must not
/// share an executor location. The child has no timeout; callers that need
/// one must bound the whole run.
pub struct Executor {
    interpreter: String,
    script_path: PathBuf,
    classifier: Box<dyn Classifier>,
}

impl Executor {
    pub fn new(interpreter: &str, script_path: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script_path: script_path.into(),
            classifier: Box::new(SignatureClassifier::new()),
        }
    }

    pub fn with_classifier<C: Classifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Writes the program to the script path, replacing the previous attempt.
    pub fn materialize(&self, program: &CandidateProgram) -> io::Result<()> {
        if let Some(parent) = self.script_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.script_path, program.as_str())
    }

    pub fn run(&self, program: &CandidateProgram) -> ExecutionResult {
        if let Err(e) = self.materialize(program) {
            error!("Failed to save simulation script: {e}");
            return ExecutionResult::launch_failure(format!(
                "failed to write {}: {e}",
                self.script_path.display()
            ));
        }
        info!(
            script = %self.script_path.display(),
            lines = program.line_count(),
            "Running simulation with {}",
            self.interpreter
        );

        let output = match Command::new(&self.interpreter)
            .arg(&self.script_path)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                error!("Failed to launch interpreter '{}': {e}", self.interpreter);
                return ExecutionResult::launch_failure(format!(
                    "failed to launch interpreter '{}': {e}",
                    self.interpreter
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let exit_status = output.status.code();
        let outcome = self.classifier.classify(exit_status, &stdout, &stderr);

        if outcome.is_success() {
            info!(?exit_status, "Simulation executed successfully");
            debug!("Simulation output: {stdout}");
        } else {
            error!(?exit_status, "Error detected in simulation output");
            debug!("Simulation stdout: {stdout}\nSimulation stderr: {stderr}");
        }

        ExecutionResult {
            exit_status,
            stdout,
            stderr,
            outcome,
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER, DEFAULT_SCRIPT_PATH)
    }
}
