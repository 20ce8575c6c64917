// src/model/mod.rs

use crate::error::PipelineError;
use std::fmt;

pub mod problem;

pub use problem::{ParsedProblem, ParsedRecord, ProblemRecord};

/// The user's free-text simulation request, as received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationRequest {
    text: String,
}

impl SimulationRequest {
    pub fn new(text: &str) -> Result<Self, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyRequest);
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// One normalized paragraph describing the simulation. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClarifiedSpec {
    text: String,
}

impl ClarifiedSpec {
    /// Returns `None` for blank text so callers fall back to the request.
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        (!text.is_empty()).then(|| Self {
            text: text.to_string(),
        })
    }

    /// Passthrough used when clarification is unavailable.
    pub fn verbatim(request: &SimulationRequest) -> Self {
        Self {
            text: request.as_str().to_string(),
        }
    }

    /// Appends a correction note for a re-parse after a failed attempt.
    pub fn augmented(&self, note: &str) -> Self {
        let note = note.trim();
        if note.is_empty() {
            return self.clone();
        }
        Self {
            text: format!(
                "{}\n\nCorrection from a failed simulation attempt: {}",
                self.text, note
            ),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ClarifiedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An executable script that has not been verified yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateProgram {
    source: String,
}

impl CandidateProgram {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_request_is_rejected() {
        assert!(matches!(
            SimulationRequest::new("   \n"),
            Err(PipelineError::EmptyRequest)
        ));
        assert_eq!(
            SimulationRequest::new("  heat plate ").unwrap().as_str(),
            "heat plate"
        );
    }

    #[test]
    fn augmented_spec_keeps_original_text() {
        let spec = ClarifiedSpec::new("A 2D heat problem.").unwrap();
        let augmented = spec.augmented("mesh must be 3D");
        assert!(augmented.as_str().starts_with("A 2D heat problem."));
        assert!(augmented.as_str().ends_with("mesh must be 3D"));
        assert_eq!(spec.augmented("  "), spec);
    }

    #[test]
    fn blank_clarification_is_none() {
        assert!(ClarifiedSpec::new("\n\t").is_none());
    }
}
