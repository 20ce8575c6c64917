// src/model/problem.rs

use crate::model::ClarifiedSpec;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured decomposition of a clarified specification.
///
/// Only the fields code generation branches on are strongly typed. Geometry,
/// conditions and materials stay as raw JSON because models describe them in
/// too many shapes to pin down, and the full text backs them up anyway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub problem_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pde_description: Option<String>,
    #[serde(deserialize_with = "dimension_from_json")]
    pub dimension: u8,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub domain: Value,
    #[serde(default)]
    pub domain_geometry_file: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub mesh: Value,
    pub variables: Vec<String>,
    pub time_dependent: bool,
    pub nonlinear: bool,
    pub coupled: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub boundary_conditions: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub initial_conditions: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub source_terms: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub material_properties: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub notes: Value,
    /// Keys the model added beyond the known schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProblemRecord {
    /// True when the mesh object names a depth resolution.
    pub fn mesh_has_depth(&self) -> bool {
        self.mesh.get("nz").is_some_and(|nz| !nz.is_null())
    }
}

/// Accepts `2`, `2.0`, `"2"` and `"2D"`.
fn dimension_from_json<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s
            .trim()
            .trim_end_matches(['d', 'D'])
            .trim()
            .parse::<u64>()
            .ok(),
        _ => None,
    };
    parsed
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| de::Error::custom(format!("invalid dimension: {value}")))
}

/// Either a decoded record or the best-effort text that could not be decoded.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedRecord {
    Structured(ProblemRecord),
    Fallback { fallback_text: String },
}

/// A parsed record, always paired with the text it was derived from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedProblem {
    pub parsed: ParsedRecord,
    pub full_text: String,
}

impl ParsedProblem {
    pub fn structured(record: ProblemRecord, spec: &ClarifiedSpec) -> Self {
        Self {
            parsed: ParsedRecord::Structured(record),
            full_text: spec.as_str().to_string(),
        }
    }

    pub fn fallback(text: &str, spec: &ClarifiedSpec) -> Self {
        Self {
            parsed: ParsedRecord::Fallback {
                fallback_text: text.to_string(),
            },
            full_text: spec.as_str().to_string(),
        }
    }

    pub fn record(&self) -> Option<&ProblemRecord> {
        match &self.parsed {
            ParsedRecord::Structured(record) => Some(record),
            ParsedRecord::Fallback { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.record().is_none()
    }
}
