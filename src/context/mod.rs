// src/context/mod.rs

use crate::llm::TextGenerator;
use crate::memory::AuditTrail;
use std::sync::Arc;

/// Runtime context shared by every stage: the generator and the audit trail.
#[derive(Clone)]
pub struct Context {
    generator: Arc<dyn TextGenerator>,
    audit: AuditTrail,
}

impl Context {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            audit: AuditTrail::discard(),
        }
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    pub fn generator(&self) -> Arc<dyn TextGenerator> {
        Arc::clone(&self.generator)
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }
}
