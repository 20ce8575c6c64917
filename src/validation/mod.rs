// src/validation/mod.rs

pub mod record;

pub use record::{KNOWN_PROBLEM_TYPES, RecordIssue, validate_record};
