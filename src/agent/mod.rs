// src/agent/mod.rs

pub mod clarifier;
pub mod code_builder;
pub mod diagnoser;
pub mod parser;
pub mod prompts;
pub mod report;

pub use clarifier::Clarifier;
pub use code_builder::CodeBuilder;
pub use diagnoser::{Diagnoser, NO_OUTPUT_PLACEHOLDER};
pub use parser::Parser;
pub use report::InsightReporter;

/// Clarification benefits from a little variety in phrasing.
pub const CLARIFY_TEMPERATURE: f32 = 0.2;
pub const DETERMINISTIC: f32 = 0.0;
