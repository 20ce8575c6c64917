// src/memory/audit.rs

use crate::memory::{AuditSink, FileSink, NullSink};
use crate::model::ParsedProblem;
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn banner(c: char) -> String {
    std::iter::repeat_n(c, 80).collect()
}

/// One failed execution, captured before diagnosis starts.
#[derive(Debug, Clone)]
pub struct ErrorRecord<'a> {
    pub timestamp: DateTime<Local>,
    pub error: &'a str,
    pub code: &'a str,
    pub output: &'a str,
}

impl<'a> ErrorRecord<'a> {
    pub fn now(error: &'a str, code: &'a str, output: &'a str) -> Self {
        Self {
            timestamp: Local::now(),
            error,
            code,
            output,
        }
    }

    pub fn render(&self) -> String {
        let separator = format!("{}\n", banner('-')).repeat(4);
        format!(
            "Timestamp: {}\nError Message: {}\n{separator}Code:\n{}\n{separator}Simulation Output:\n{}\n{separator}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.error,
            self.code,
            self.output,
        )
    }
}

/// The four append-only audit streams the pipeline writes.
#[derive(Clone)]
pub struct AuditTrail {
    parsed_json: Arc<dyn AuditSink>,
    parsed_text: Arc<dyn AuditSink>,
    error_log: Arc<dyn AuditSink>,
    prompt_log: Arc<dyn AuditSink>,
}

impl AuditTrail {
    pub fn new(
        parsed_json: Arc<dyn AuditSink>,
        parsed_text: Arc<dyn AuditSink>,
        error_log: Arc<dyn AuditSink>,
        prompt_log: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            parsed_json,
            parsed_text,
            error_log,
            prompt_log,
        }
    }

    /// File-backed trail rooted at `dir`.
    pub fn in_dir(
        dir: &Path,
        parsed_json: &str,
        parsed_text: &str,
        error_log: &str,
        prompt_log: &str,
    ) -> Self {
        Self::new(
            Arc::new(FileSink::new(dir.join(parsed_json))),
            Arc::new(FileSink::new(dir.join(parsed_text))),
            Arc::new(FileSink::new(dir.join(error_log))),
            Arc::new(FileSink::new(dir.join(prompt_log))),
        )
    }

    pub fn discard() -> Self {
        let null: Arc<dyn AuditSink> = Arc::new(NullSink);
        Self::new(null.clone(), null.clone(), null.clone(), null)
    }

    /// Writes a parse result as a JSON line and as a readable block.
    pub fn record_parse(&self, problem: &ParsedProblem) {
        match serde_json::to_string(problem) {
            Ok(line) => write_best_effort("parsed_json", &*self.parsed_json, &format!("{line}\n")),
            Err(e) => error!("Failed to serialize parsed result: {e}"),
        }

        let parsed = serde_json::to_string(&problem.parsed).unwrap_or_else(|_| "null".into());
        let full_text =
            serde_json::to_string(&problem.full_text).unwrap_or_else(|_| "\"\"".into());
        let block = format!(
            "[PARSED RESULT]\nparsed: {parsed}\nfull_text: {full_text}\n\n{}\n\n",
            banner('-')
        );
        write_best_effort("parsed_text", &*self.parsed_text, &block);
    }

    pub fn record_error(&self, record: &ErrorRecord<'_>) {
        write_best_effort("error_log", &*self.error_log, &record.render());
    }

    pub fn record_prompt(&self, prompt: &str) {
        let entry = format!(
            "\n{}\nTimestamp: {}\n{prompt}\n",
            banner('='),
            Local::now().format(TIMESTAMP_FORMAT)
        );
        write_best_effort("prompt_log", &*self.prompt_log, &entry);
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::discard()
    }
}

/// Audit writes never fail the caller.
fn write_best_effort(stream: &str, sink: &dyn AuditSink, entry: &str) {
    match sink.append(entry) {
        Ok(()) => debug!(stream, bytes = entry.len(), "audit record written"),
        Err(e) => error!(stream, "Failed to write audit record: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySink;
    use crate::model::ClarifiedSpec;
    use chrono::TimeZone;
    use std::io;

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn append(&self, _entry: &str) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    fn memory_trail() -> (AuditTrail, [Arc<InMemorySink>; 4]) {
        let sinks = [
            Arc::new(InMemorySink::new()),
            Arc::new(InMemorySink::new()),
            Arc::new(InMemorySink::new()),
            Arc::new(InMemorySink::new()),
        ];
        let trail = AuditTrail::new(
            sinks[0].clone(),
            sinks[1].clone(),
            sinks[2].clone(),
            sinks[3].clone(),
        );
        (trail, sinks)
    }

    #[test]
    fn error_record_layout() {
        let record = ErrorRecord {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            error: "NameError: name 'u_n' is not defined",
            code: "print(u_n)",
            output: "",
        };
        let text = record.render();
        assert!(text.starts_with("Timestamp: 2024-05-01 09:30:00\nError Message: NameError"));
        assert_eq!(text.matches(&banner('-')).count(), 12);
        assert!(text.contains("Code:\nprint(u_n)\n"));
        assert!(text.contains("Simulation Output:\n\n"));
    }

    #[test]
    fn parse_is_written_to_both_streams() {
        let (trail, sinks) = memory_trail();
        let spec = ClarifiedSpec::new("heat plate").unwrap();
        trail.record_parse(&ParsedProblem::fallback("heat plate", &spec));

        let line = sinks[0].contents();
        assert!(line.ends_with('\n'));
        let decoded: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(decoded["full_text"], "heat plate");

        let block = sinks[1].contents();
        assert!(block.starts_with("[PARSED RESULT]\nparsed: {\"fallback_text\":\"heat plate\"}\n"));
        assert!(block.contains("full_text: \"heat plate\"\n"));
    }

    #[test]
    fn prompt_entries_are_bannered() {
        let (trail, sinks) = memory_trail();
        trail.record_prompt("fix this");
        let entry = sinks[3].contents();
        assert!(entry.starts_with(&format!("\n{}\nTimestamp: ", banner('='))));
        assert!(entry.ends_with("fix this\n"));
    }

    #[test]
    fn failing_sink_is_swallowed() {
        let broken: Arc<dyn AuditSink> = Arc::new(BrokenSink);
        let trail = AuditTrail::new(broken.clone(), broken.clone(), broken.clone(), broken);
        trail.record_prompt("still fine");
        trail.record_error(&ErrorRecord::now("e", "c", "o"));
    }
}
