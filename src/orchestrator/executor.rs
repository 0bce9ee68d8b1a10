//! Tool execution: child process spawning and output streaming.
//!
//! Every external command the build runs goes through [`ToolRunner`]. The
//! production implementation, [`ProcessRunner`], spawns the command with
//! tokio, streams stdout and stderr line by line into the session log, and
//! waits for the exit status before returning. Nothing runs in parallel.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Lines of combined output kept for error reporting.
pub const OUTPUT_TAIL_LINES: usize = 40;

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: PathBuf,
    /// Variables set (or overridden) for the child only
    pub env: Vec<(OsString, OsString)>,
    /// Variables removed for the child only
    pub env_remove: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>, current_dir: &Path) -> Self {
        Invocation {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            current_dir: current_dir.to_path_buf(),
            env: Vec::new(),
            env_remove: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn env_remove(mut self, key: impl AsRef<OsStr>) -> Self {
        self.env_remove.push(key.as_ref().to_os_string());
        self
    }

    /// Whether the argument list contains `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// Value of a variable set for the child, if any.
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// How a command finished.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolExit {
    pub success: bool,
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
    /// Last lines of combined stdout/stderr
    pub output_tail: Vec<String>,
}

impl ToolExit {
    pub fn success() -> Self {
        ToolExit {
            success: true,
            code: Some(0),
            output_tail: Vec::new(),
        }
    }

    pub fn failure(code: i32) -> Self {
        ToolExit {
            success: false,
            code: Some(code),
            output_tail: Vec::new(),
        }
    }

    pub fn with_output(mut self, lines: &[&str]) -> Self {
        self.output_tail = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Human-readable exit description used in error messages.
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Seam for running external commands.
///
/// `Err` means the command could not be started at all (typically: not on
/// PATH). A command that ran and failed is `Ok` with `success == false`.
pub trait ToolRunner: Send + Sync {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, std::io::Result<ToolExit>>;
}

/// One line of tool output, lossily decoded, without its line terminator.
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Echo tool output to the console as well as the log
    pub echo: bool,
}

impl ProcessRunner {
    pub fn new(echo: bool) -> Self {
        ProcessRunner { echo }
    }

    fn record_line(&self, tail: &mut VecDeque<String>, line: String, stream: &str) {
        log::info!(target: "tool", "[{}] {}", stream, line);
        if self.echo {
            println!("    {}", line);
        }
        if tail.len() == OUTPUT_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    async fn run_process(&self, invocation: &Invocation) -> std::io::Result<ToolExit> {
        log::info!("[Executor] Running: {}", invocation);

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        command.current_dir(&invocation.current_dir);
        for key in &invocation.env_remove {
            command.env_remove(key);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }
        command.stdin(std::process::Stdio::null());
        command.stdout(std::process::Stdio::piped());
        command.stderr(std::process::Stdio::piped());

        let mut child = command.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

        // Raw byte lines: a stray non-UTF-8 byte must not stop the drain,
        // or the child blocks on a full pipe.
        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let mut stdout_closed = false;
        let mut stderr_closed = false;
        let mut tail: VecDeque<String> = VecDeque::with_capacity(OUTPUT_TAIL_LINES);

        while !(stdout_closed && stderr_closed) {
            tokio::select! {
                read = stdout.read_until(b'\n', &mut stdout_buf), if !stdout_closed => {
                    match read {
                        Ok(0) => stdout_closed = true,
                        Ok(_) => {
                            self.record_line(&mut tail, decode_line(&stdout_buf), "stdout");
                            stdout_buf.clear();
                        }
                        Err(e) => {
                            log::warn!("[Executor] stdout read error: {}", e);
                            stdout_closed = true;
                        }
                    }
                }
                read = stderr.read_until(b'\n', &mut stderr_buf), if !stderr_closed => {
                    match read {
                        Ok(0) => stderr_closed = true,
                        Ok(_) => {
                            self.record_line(&mut tail, decode_line(&stderr_buf), "stderr");
                            stderr_buf.clear();
                        }
                        Err(e) => {
                            log::warn!("[Executor] stderr read error: {}", e);
                            stderr_closed = true;
                        }
                    }
                }
            }
        }

        let status = child.wait().await?;
        log::info!("[Executor] {} finished: {}", invocation.program.to_string_lossy(), status);

        Ok(ToolExit {
            success: status.success(),
            code: status.code(),
            output_tail: tail.into_iter().collect(),
        })
    }
}

impl ToolRunner for ProcessRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, std::io::Result<ToolExit>> {
        Box::pin(self.run_process(invocation))
    }
}
