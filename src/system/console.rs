//! Operator-facing console output.
//!
//! Step counters, error lines and the success banner. Logging goes through
//! `log::` into the session file; this is what the person running the build
//! reads.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use owo_colors::{OwoColorize, Stream};

use crate::models::BuildReport;

/// Number of operator-visible stages ("STEP x/4").
pub const STAGE_COUNT: usize = 4;

pub mod symbols {
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const ARROW: &str = "→";
}

#[derive(Clone)]
enum Sink {
    Terminal,
    Captured(Arc<Mutex<String>>),
}

/// Writes build progress to the terminal, or to a buffer in tests.
#[derive(Clone)]
pub struct Console {
    sink: Sink,
}

impl Default for Console {
    fn default() -> Self {
        Self::terminal()
    }
}

impl Console {
    pub fn terminal() -> Self {
        Console {
            sink: Sink::Terminal,
        }
    }

    /// A console that records everything instead of printing.
    pub fn captured() -> Self {
        Console {
            sink: Sink::Captured(Arc::new(Mutex::new(String::new()))),
        }
    }

    /// Text recorded so far (empty for a terminal console).
    pub fn contents(&self) -> String {
        match &self.sink {
            Sink::Terminal => String::new(),
            Sink::Captured(buf) => buf.lock().map(|b| b.clone()).unwrap_or_default(),
        }
    }

    fn out(&self, plain: &str, styled: impl FnOnce() -> String) {
        match &self.sink {
            Sink::Terminal => println!("{}", styled()),
            Sink::Captured(buf) => {
                if let Ok(mut b) = buf.lock() {
                    b.push_str(plain);
                    b.push('\n');
                }
            }
        }
    }

    fn err(&self, plain: &str, styled: impl FnOnce() -> String) {
        match &self.sink {
            Sink::Terminal => eprintln!("{}", styled()),
            Sink::Captured(buf) => {
                if let Ok(mut b) = buf.lock() {
                    b.push_str(plain);
                    b.push('\n');
                }
            }
        }
    }

    /// `STEP x/4: <title>`
    pub fn step(&self, stage: usize, title: &str) {
        let counter = format!("STEP {}/{}", stage, STAGE_COUNT);
        let plain = format!("{}: {}", counter, title);
        self.out(&plain, || {
            format!(
                "\n{}: {}",
                counter.if_supports_color(Stream::Stdout, |s| s.bold()),
                title
            )
        });
    }

    pub fn info(&self, message: &str) {
        self.out(message, || message.to_string());
    }

    /// Indented progress line under the current step.
    pub fn detail(&self, message: &str) {
        let plain = format!("  {} {}", symbols::ARROW, message);
        self.out(&plain, || {
            format!(
                "  {} {}",
                symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
                message
            )
        });
    }

    /// Red labeled error line, followed by the hint if there is one.
    pub fn error(&self, label: &str, message: &str, hint: Option<&str>) {
        let plain = format!("{} {}: {}", symbols::ERROR, label, message);
        self.err(&plain, || {
            format!(
                "\n{} {}: {}",
                symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
                label.if_supports_color(Stream::Stderr, |s| s.red().bold().to_string()),
                message.if_supports_color(Stream::Stderr, |s| s.red())
            )
        });
        if let Some(hint) = hint {
            let plain = format!("  Hint: {}", hint);
            self.err(&plain, || {
                format!(
                    "  {} {}",
                    "Hint:".if_supports_color(Stream::Stderr, |s| s.yellow()),
                    hint
                )
            });
        }
    }

    pub fn success(&self, report: &BuildReport) {
        let name = report
            .executable
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| report.executable.display().to_string());
        let headline = format!("{} BUILD SUCCESSFUL: {}", symbols::SUCCESS, name);
        let summary = format!(
            "  {} ({}, built in {})",
            report.executable.display(),
            format_bytes(report.size_bytes),
            format_duration(Duration::from_millis(report.elapsed_ms as u64))
        );

        self.out(&headline, || {
            format!(
                "\n{}",
                headline.if_supports_color(Stream::Stdout, |s| s.green().bold().to_string())
            )
        });
        self.out(&summary, || summary.clone());
    }
}

const SIZE_UNITS: [&str; 4] = ["bytes", "KiB", "MiB", "GiB"];

/// Executable size for the success banner, in binary units.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < SIZE_UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, SIZE_UNITS[0])
    } else {
        format!("{:.1} {}", value, SIZE_UNITS[unit])
    }
}

/// Build time for the success banner. Sub-minute builds keep one decimal.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(38 * 1024 * 1024 + 512 * 1024), "38.5 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
        assert_eq!(format_bytes(5000 * 1024 * 1024 * 1024), "5000.0 GiB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(4_500)), "4.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1h 02m 05s");
    }

    #[test]
    fn test_captured_step_and_error() {
        let console = Console::captured();
        console.step(3, "Installing dependencies");
        console.error(
            "DEPENDENCY INSTALLATION FAILED",
            "pip install exited with code 1",
            Some("move the project to a shorter path"),
        );

        let text = console.contents();
        assert!(text.contains("STEP 3/4: Installing dependencies"));
        assert!(text.contains("DEPENDENCY INSTALLATION FAILED: pip install exited with code 1"));
        assert!(text.contains("Hint: move the project to a shorter path"));
    }

    #[test]
    fn test_success_banner_names_executable() {
        let console = Console::captured();
        console.success(&BuildReport {
            executable: PathBuf::from("/work/pdf_toolkit"),
            size_bytes: 2048,
            elapsed_ms: 61_000,
            interpreter_version: Some("3.11.4".to_string()),
        });

        let text = console.contents();
        assert!(text.contains("BUILD SUCCESSFUL: pdf_toolkit"));
        assert!(text.contains("2.0 KiB"));
        assert!(text.contains("1m 01s"));
    }

    #[test]
    fn test_terminal_console_records_nothing() {
        assert!(Console::terminal().contents().is_empty());
    }
}
