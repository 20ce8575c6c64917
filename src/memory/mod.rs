// src/memory/mod.rs

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub mod audit;

pub use audit::{AuditTrail, ErrorRecord};

/// Append-only destination for audit records. Never read back by the pipeline.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &str) -> io::Result<()>;
}

/// Appends to a file, creating it and its directory on first write.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileSink {
    fn append(&self, entry: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}

/// In-memory sink, handy for tests and dry runs.
#[derive(Default, Debug)]
pub struct InMemorySink {
    entries: Mutex<Vec<String>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_all(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn contents(&self) -> String {
        self.read_all().concat()
    }
}

impl AuditSink for InMemorySink {
    fn append(&self, entry: &str) -> io::Result<()> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("audit sink lock poisoned"))?
            .push(entry.to_string());
        Ok(())
    }
}

/// Drops everything.
#[derive(Default, Debug, Clone, Copy)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn append(&self, _entry: &str) -> io::Result<()> {
        Ok(())
    }
}
