use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::JoinHandle;

use vei_types::TraceRecord;

const STREAM_QUEUE_CAPACITY: usize = 256;

/// Buffers `TraceRecord`s and flushes them to `trace.jsonl` (section 4.3).
/// File I/O failures are swallowed and reported to stderr — "storage
/// writes are best-effort" (section 5).
pub struct TraceLogger {
    path: Option<PathBuf>,
    pending: Vec<TraceRecord>,
    streamer: Option<TraceStreamer>,
}

impl TraceLogger {
    pub fn new(artifacts_dir: Option<PathBuf>) -> Self {
        let path = artifacts_dir.map(|dir| dir.join("trace.jsonl"));
        Self { path, pending: Vec::new(), streamer: None }
    }

    pub fn with_streaming(mut self, endpoint: impl Into<String>) -> Self {
        self.streamer = Some(TraceStreamer::spawn(endpoint.into()));
        self
    }

    pub fn record(&mut self, record: TraceRecord) {
        if let Some(streamer) = &self.streamer {
            if let Ok(line) = serde_json::to_string(&record) {
                streamer.try_send(line);
            }
        }
        self.pending.push(record);
    }

    /// Appends all pending records to `trace.jsonl` in order (section 4.3,
    /// "file-level entries are written in append order").
    pub fn flush(&mut self) {
        let Some(path) = &self.path else {
            self.pending.clear();
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                eprintln!("vei-engine: trace flush mkdir failed: {err}");
                self.pending.clear();
                return;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path);
        match file {
            Ok(mut file) => {
                for record in self.pending.drain(..) {
                    match serde_json::to_string(&record) {
                        Ok(line) => {
                            if let Err(err) = writeln!(file, "{line}") {
                                eprintln!("vei-engine: trace flush write failed: {err}");
                            }
                        }
                        Err(err) => eprintln!("vei-engine: trace record serialize failed: {err}"),
                    }
                }
            }
            Err(err) => {
                eprintln!("vei-engine: trace flush open failed: {err}");
                self.pending.clear();
            }
        }
    }

    pub fn shutdown(&mut self) {
        self.flush();
        if let Some(streamer) = self.streamer.take() {
            streamer.shutdown();
        }
    }
}

/// Drains a bounded queue on a background thread, POSTing each trace line
/// to a configured endpoint (section 4.3, "Optional asynchronous
/// streaming"). This is the one auxiliary thread the core permits
/// (section 5). Overflow drops silently — "to preserve determinism and
/// latency" — never blocking the simulation thread.
struct TraceStreamer {
    sender: SyncSender<String>,
    handle: Option<JoinHandle<()>>,
}

impl TraceStreamer {
    fn spawn(endpoint: String) -> Self {
        let (sender, receiver): (SyncSender<String>, Receiver<String>) = mpsc::sync_channel(STREAM_QUEUE_CAPACITY);
        let handle = std::thread::spawn(move || stream_loop(endpoint, receiver));
        Self { sender, handle: Some(handle) }
    }

    fn try_send(&self, line: String) {
        let _ = self.sender.try_send(line);
    }

    fn shutdown(mut self) {
        drop(self.sender.clone());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TraceStreamer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn stream_loop(endpoint: String, receiver: Receiver<String>) {
    let client = reqwest::blocking::Client::new();
    while let Ok(line) = receiver.recv() {
        if let Err(err) = client.post(&endpoint).header("content-type", "application/x-ndjson").body(line).send() {
            eprintln!("vei-engine: trace stream POST failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vei_types::TraceRecord as TR;

    #[test]
    fn flush_appends_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = TraceLogger::new(Some(dir.path().to_path_buf()));
        logger.record(TR::call("slack.send_message".to_string(), serde_json::json!({}), serde_json::json!({"ts": "1"}), 0));
        logger.record(TR::call("mail.compose".to_string(), serde_json::json!({}), serde_json::json!({"id": "m1"}), 10));
        logger.flush();
        let content = fs::read_to_string(dir.path().join("trace.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("slack.send_message"));
        assert!(lines[1].contains("mail.compose"));
    }

    #[test]
    fn flush_creates_a_missing_artifacts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("artifacts");
        let mut logger = TraceLogger::new(Some(nested.clone()));
        logger.record(TR::call("erp.create_po".to_string(), serde_json::json!({}), serde_json::json!({"id": "po-1"}), 0));
        logger.flush();
        let content = fs::read_to_string(nested.join("trace.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn flush_with_no_artifacts_dir_is_a_silent_noop() {
        let mut logger = TraceLogger::new(None);
        logger.record(TR::call("x".to_string(), serde_json::json!({}), serde_json::json!({}), 0));
        logger.flush();
    }

    #[test]
    fn second_flush_does_not_duplicate_first_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = TraceLogger::new(Some(dir.path().to_path_buf()));
        logger.record(TR::call("a".to_string(), serde_json::json!({}), serde_json::json!({}), 0));
        logger.flush();
        logger.flush();
        let content = fs::read_to_string(dir.path().join("trace.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
