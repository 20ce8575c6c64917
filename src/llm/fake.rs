// src/llm/fake.rs

use crate::error::GenerationError;
use crate::llm::{GenerationRequest, TextGenerator};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Replays a fixed script of replies and failures, recording every request.
///
/// Useful for dry runs and for driving the pipeline in tests.
#[derive(Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        lock(&self.script).push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, reason: &str) -> Self {
        lock(&self.script).push_back(Err(reason.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        lock(&self.requests).push(request.clone());
        match lock(&self.script).pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(GenerationError::Unavailable(reason)),
            None => Err(GenerationError::Unavailable("script exhausted".into())),
        }
    }
}
