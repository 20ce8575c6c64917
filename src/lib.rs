pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod llm;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod protocol;
pub mod validation;
