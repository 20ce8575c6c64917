// src/validation/record.rs

use crate::model::ProblemRecord;
use serde_json::{Value, json};

/// Problem families the code-generation prompt knows how to handle.
pub const KNOWN_PROBLEM_TYPES: &[&str] = &[
    "heat",
    "fluid",
    "elasticity",
    "hyperelasticity",
    "fracture",
    "phase_field_fracture",
    "reaction_diffusion",
];

#[derive(Debug, PartialEq)]
pub enum RecordIssue {
    EmptyField(&'static str),
    DimensionOutOfRange(u8),
    MeshDepthMismatch { dimension: u8, has_nz: bool },
    UnknownProblemType(String),
    MissingTimeStep,
}

impl RecordIssue {
    pub fn hint(&self) -> (String, Option<Value>) {
        match self {
            RecordIssue::EmptyField(field) => (
                format!("Field '{field}' is empty."),
                Some(json!({ field.to_string(): "<required>" })),
            ),
            RecordIssue::DimensionOutOfRange(d) => (
                format!("Dimension {d} is not 1, 2 or 3."),
                Some(json!({ "dimension": 2 })),
            ),
            RecordIssue::MeshDepthMismatch { dimension, has_nz } => {
                if *has_nz {
                    (
                        format!("Mesh names 'nz' but the problem is {dimension}D."),
                        Some(json!({ "mesh": { "nx": 32, "ny": 32 } })),
                    )
                } else {
                    (
                        "3D problem mesh is missing 'nz'.".to_string(),
                        Some(json!({ "mesh": { "nx": 16, "ny": 16, "nz": 16 } })),
                    )
                }
            }
            RecordIssue::UnknownProblemType(kind) => (
                format!(
                    "Problem type '{kind}' is not one of: {}.",
                    KNOWN_PROBLEM_TYPES.join(", ")
                ),
                None,
            ),
            RecordIssue::MissingTimeStep => (
                "Time-dependent problem without a time step in notes or extras.".to_string(),
                Some(json!({ "notes": "dt = 0.01" })),
            ),
        }
    }
}

/// Shape-checks a decoded record. Issues are advisory; nothing is rejected.
pub fn validate_record(record: &ProblemRecord) -> Vec<RecordIssue> {
    let mut issues = Vec::new();

    let kind = record.problem_type.trim();
    if kind.is_empty() {
        issues.push(RecordIssue::EmptyField("problem_type"));
    } else if !KNOWN_PROBLEM_TYPES.contains(&kind.to_ascii_lowercase().as_str()) {
        issues.push(RecordIssue::UnknownProblemType(kind.to_string()));
    }

    if !(1..=3).contains(&record.dimension) {
        issues.push(RecordIssue::DimensionOutOfRange(record.dimension));
    } else if !record.mesh.is_null() {
        let has_nz = record.mesh_has_depth();
        if has_nz != (record.dimension == 3) {
            issues.push(RecordIssue::MeshDepthMismatch {
                dimension: record.dimension,
                has_nz,
            });
        }
    }

    if record.variables.iter().all(|v| v.trim().is_empty()) {
        issues.push(RecordIssue::EmptyField("variables"));
    }

    if record.time_dependent && !mentions_time_step(record) {
        issues.push(RecordIssue::MissingTimeStep);
    }

    issues
}

fn mentions_time_step(record: &ProblemRecord) -> bool {
    let notes = record.notes.to_string().to_ascii_lowercase();
    notes.contains("dt")
        || notes.contains("time step")
        || record.extra.keys().any(|k| {
            let k = k.to_ascii_lowercase();
            k == "dt" || k.contains("time_step") || k.contains("timestep")
        })
}
