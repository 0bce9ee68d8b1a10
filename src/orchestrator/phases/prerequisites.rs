//! Step 1: interpreter discovery and source file check.
//!
//! Nothing is created on disk here, so a failure needs no cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::BuildError;
use crate::models::BuildLayout;
use crate::orchestrator::executor::{Invocation, ToolRunner};

/// Oldest interpreter the packaging toolchain still supports.
pub const MIN_PYTHON: (u32, u32) = (3, 8);

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

/// What step 1 learned about the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterInfo {
    pub command: String,
    /// `None` when the version banner could not be parsed
    pub version: Option<(u32, u32, u32)>,
}

impl InterpreterInfo {
    pub fn version_string(&self) -> Option<String> {
        self.version
            .map(|(major, minor, patch)| format!("{}.{}.{}", major, minor, patch))
    }
}

/// Parse a `python --version` banner such as `Python 3.11.4`.
pub fn parse_python_version(output: &str) -> Option<(u32, u32, u32)> {
    let caps = VERSION_RE.captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some((major, minor, patch))
}

/// Verify `interpreter` is reachable on PATH and recent enough.
pub async fn discover_interpreter(
    runner: &dyn ToolRunner,
    interpreter: &str,
    layout: &BuildLayout,
) -> Result<InterpreterInfo, BuildError> {
    let invocation = Invocation::new(interpreter, &layout.root).arg("--version");

    let exit = runner
        .run(&invocation)
        .await
        .map_err(|e| BuildError::MissingInterpreter {
            reason: format!("'{}' could not be started: {}", interpreter, e),
        })?;

    if !exit.success {
        return Err(BuildError::MissingInterpreter {
            reason: format!("'{} --version' {}", interpreter, exit.describe()),
        });
    }

    let version = exit
        .output_tail
        .iter()
        .find_map(|line| parse_python_version(line));

    match version {
        Some((major, minor, patch)) => {
            log::info!(
                "[Prerequisites] Found {} version {}.{}.{}",
                interpreter,
                major,
                minor,
                patch
            );
            if (major, minor) < MIN_PYTHON {
                return Err(BuildError::MissingInterpreter {
                    reason: format!(
                        "'{}' is Python {}.{}, at least {}.{} is required",
                        interpreter, major, minor, MIN_PYTHON.0, MIN_PYTHON.1
                    ),
                });
            }
        }
        None => {
            log::warn!(
                "[Prerequisites] Could not parse version banner of '{}', continuing",
                interpreter
            );
        }
    }

    Ok(InterpreterInfo {
        command: interpreter.to_string(),
        version,
    })
}

/// The entry point to package must exist before anything is created.
pub fn check_source(layout: &BuildLayout) -> Result<(), BuildError> {
    let source = layout.source_path();
    if !source.is_file() {
        return Err(BuildError::MissingSource(source));
    }
    log::info!("[Prerequisites] Source found at {}", source.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_source, Script, ScriptedRunner, ToolKind};
    use tempfile::TempDir;

    #[test]
    fn test_parse_python_version() {
        assert_eq!(parse_python_version("Python 3.11.4"), Some((3, 11, 4)));
        assert_eq!(parse_python_version("Python 3.12"), Some((3, 12, 0)));
        assert_eq!(parse_python_version("Python 2.7.18"), Some((2, 7, 18)));
        assert_eq!(parse_python_version("pip 23.0"), None);
    }

    #[tokio::test]
    async fn test_discover_interpreter_success() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let layout = BuildLayout::new(temp.path());
        let runner = ScriptedRunner::new(layout.clone());

        let info = discover_interpreter(&runner, "python", &layout).await.unwrap();
        assert_eq!(info.version, Some((3, 11, 4)));
        assert_eq!(info.version_string().as_deref(), Some("3.11.4"));
    }

    #[tokio::test]
    async fn test_discover_interpreter_not_on_path() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let layout = BuildLayout::new(temp.path());
        let runner =
            ScriptedRunner::new(layout.clone()).with_script(ToolKind::Version, Script::NotFound);

        let err = discover_interpreter(&runner, "python", &layout)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingInterpreter { .. }));
    }

    #[tokio::test]
    async fn test_discover_interpreter_rejects_python2() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let layout = BuildLayout::new(temp.path());
        let runner = ScriptedRunner::new(layout.clone()).with_version_output("Python 2.7.18");

        let err = discover_interpreter(&runner, "python", &layout)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 3.8"));
    }

    #[tokio::test]
    async fn test_discover_interpreter_tolerates_unknown_banner() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let layout = BuildLayout::new(temp.path());
        let runner = ScriptedRunner::new(layout.clone()).with_version_output("custom build");

        let info = discover_interpreter(&runner, "python", &layout).await.unwrap();
        assert_eq!(info.version, None);
    }

    #[test]
    fn test_check_source() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let layout = BuildLayout::new(temp.path());
        assert!(matches!(
            check_source(&layout),
            Err(BuildError::MissingSource(_))
        ));

        write_source(&layout).unwrap();
        assert!(check_source(&layout).is_ok());
    }
}
