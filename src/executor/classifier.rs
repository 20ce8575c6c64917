// src/executor/classifier.rs

use crate::protocol::{Outcome, join_nonempty};
use regex::Regex;
use std::sync::LazyLock;

/// Markers that mean a run failed even when the interpreter exited 0.
///
/// Python tracebacks and exception names, FEniCS form-compiler failures, and
/// native aborts that solvers print before returning cleanly.
pub const FAILURE_SIGNATURES: &[&str] = &[
    "Traceback",
    "NameError",
    "SyntaxError",
    "Exception",
    "RuntimeError",
    "ImportError",
    "ValueError",
    "TypeError",
    "AttributeError",
    "IndexError",
    "KeyError",
    "IndentationError",
    "ZeroDivisionError",
    "MemoryError",
    "FileNotFoundError",
    "ModuleNotFoundError",
    "FloatingPointError",
    "OSError",
    "DijitsoError",
    "Unable to compile",
    "Segmentation fault",
    "Killed",
    "ArityMismatch",
    "UFLException",
    "form compilation failed",
    "compute_form_data",
    "ffc.jit",
    "ffcjitsigning",
    "map_expr_dag",
    "check_integrand_arity",
    "check_form_arity",
    "analyze_ufl_objects",
    "compile_form",
];

static DEFAULT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    signature_pattern(FAILURE_SIGNATURES)
        .expect("built-in failure signatures form a valid pattern")
});

fn signature_pattern(signatures: &[&str]) -> Result<Regex, regex::Error> {
    let alternation = signatures
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("({alternation})"))
}

/// Decides whether a finished run succeeded.
///
/// Must be pure: the same status and streams always give the same outcome.
pub trait Classifier: Send + Sync {
    fn classify(&self, exit_status: Option<i32>, stdout: &str, stderr: &str) -> Outcome;
}

/// Substring scan over captured output, independent of the exit code.
#[derive(Clone, Debug)]
pub struct SignatureClassifier {
    pattern: Regex,
}

impl SignatureClassifier {
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.clone(),
        }
    }

    /// Built-in signatures plus `extra`.
    pub fn with_extra_signatures<'a>(
        extra: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, regex::Error> {
        let mut signatures: Vec<&str> = FAILURE_SIGNATURES.to_vec();
        signatures.extend(extra);
        Ok(Self {
            pattern: signature_pattern(&signatures)?,
        })
    }

    /// The first signature found in `text`, if any.
    pub fn first_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern.find(text).map(|m| m.as_str())
    }
}

impl Default for SignatureClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for SignatureClassifier {
    fn classify(&self, exit_status: Option<i32>, stdout: &str, stderr: &str) -> Outcome {
        match exit_status {
            Some(0) => {
                if self.first_match(stdout).is_some() || self.first_match(stderr).is_some() {
                    Outcome::Failure {
                        error: join_nonempty(stdout, stderr),
                    }
                } else {
                    Outcome::Success {
                        output: stdout.to_string(),
                    }
                }
            }
            status => {
                let error = if stderr.trim().is_empty() {
                    match status {
                        Some(code) => format!("process exited with status {code} and no stderr"),
                        None => "process terminated by a signal".to_string(),
                    }
                } else {
                    stderr.to_string()
                };
                Outcome::Failure { error }
            }
        }
    }
}
