//! Session log file for a build.
//!
//! Every `log::` record emitted during a build, including the line-by-line
//! output of the external tools (target `tool`), is appended to a single
//! timestamped file. The console stays reserved for step banners and tool
//! output; the file is the full record.
//!
//! ```text
//! log::info!() / log::error!()
//!     |
//! [LogCollector] (non-blocking send)
//!     | (crossbeam unbounded channel)
//!     v
//! [writer thread] -> <log_dir>/build-<YYYYmmdd_HHMMSS>.log
//! ```
//!
//! The writer runs on a plain OS thread so records sent from tool reader
//! tasks and from the orchestrator land in the same order they were sent.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or flush marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    /// Record target, e.g. `tool` for external tool output
    pub target: String,
    /// Wall-clock time the line was created
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: impl Into<String>) -> Self {
        LogLine {
            message: message.into(),
            target: "build".to_string(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    fn format(&self) -> String {
        if self.target == "tool" {
            format!("[{}] | {}\n", self.timestamp, self.message)
        } else {
            format!("[{}] {}\n", self.timestamp, self.message)
        }
    }
}

/// File name for a session started now.
pub fn session_file_name() -> String {
    format!("build-{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Ensure the log directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory {}: {}", log_dir.display(), e))
}

/// Logger that persists one build session to disk.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    session_path: PathBuf,
}

impl LogCollector {
    /// Create the session file in `log_dir` and start the writer thread.
    pub fn new(log_dir: &Path) -> Result<Self, String> {
        ensure_logs_dir_exists(log_dir)?;

        let session_path = log_dir.join(session_file_name());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&session_path)
            .map_err(|e| format!("Failed to create log file {}: {}", session_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        std::thread::spawn(move || {
            let mut file: File = file;
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let _ = file.write_all(line.format().as_bytes());
                    }
                    LogMessage::Flush(done) => {
                        let _ = file.flush();
                        let _ = file.sync_data();
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector { tx, session_path })
    }

    /// Path of this session's log file
    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Send a log line (non-blocking, never fails)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Wait until every line sent before this call is on disk.
    ///
    /// Call before exiting so the final outcome line is not lost.
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;

        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))?;
        Ok(())
    }
}

/// Wires `log::info!()` and friends into the session file
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = if record.target() == "tool" {
            record.args().to_string()
        } else {
            format!("[{}] {}", record.level(), record.args())
        };
        self.log_line(LogLine::new(message).with_target(record.target()));
    }

    fn flush(&self) {}
}
