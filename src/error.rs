//! Unified error type hierarchy for the PDF Toolkit builder
//!
//! Provides structured error handling with ConfigError for settings problems and
//! BuildError for every way a build step can abort.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::state::BuildStep;

/// Remediation shown when dependency installation fails.
pub const SHORT_PATH_HINT: &str =
    "Move the project to a shorter path (e.g. C:\\pdf_toolkit) and run the build again";

/// Settings file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in settings: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Settings validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during settings operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build step failures. Every variant aborts the run.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Python interpreter not found or unusable: {reason}")]
    MissingInterpreter { reason: String },

    #[error("Source file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to create isolated environment: {reason}")]
    EnvironmentCreation {
        reason: String,
        exit_code: Option<i32>,
    },

    #[error("Failed to activate isolated environment: {reason}")]
    EnvironmentActivation { reason: String },

    #[error("Failed to install dependencies: {reason}")]
    DependencyInstall {
        reason: String,
        exit_code: Option<i32>,
    },

    #[error("Packaging failed: {reason}")]
    Packaging {
        reason: String,
        exit_code: Option<i32>,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    Cleanup {
        step: BuildStep,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid step transition: {from} -> {to}")]
    InvalidTransition { from: BuildStep, to: BuildStep },

    #[error("Built executable unreadable at {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// The step that was running when this error aborted the build.
    pub fn failed_step(&self) -> BuildStep {
        match self {
            BuildError::MissingInterpreter { .. } | BuildError::MissingSource(_) => {
                BuildStep::InterpreterDiscovery
            }
            BuildError::EnvironmentCreation { .. } => BuildStep::EnvironmentIsolation,
            BuildError::EnvironmentActivation { .. } => BuildStep::EnvironmentActivation,
            BuildError::DependencyInstall { .. } => BuildStep::DependencyInstallation,
            BuildError::Packaging { .. } => BuildStep::Packaging,
            BuildError::Cleanup { step, .. } => *step,
            BuildError::InvalidTransition { from, .. } => *from,
            BuildError::Report { .. } => BuildStep::SuccessReport,
        }
    }

    /// Operator remediation hint, if this failure has one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            BuildError::MissingInterpreter { .. } => {
                Some("Install Python 3 and make sure it is on PATH")
            }
            BuildError::DependencyInstall { .. } => Some(SHORT_PATH_HINT),
            _ => None,
        }
    }

    /// Process exit code to surface: the failing tool's own code when known.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::EnvironmentCreation { exit_code, .. }
            | BuildError::DependencyInstall { exit_code, .. }
            | BuildError::Packaging { exit_code, .. } => match exit_code {
                Some(code) if *code != 0 => *code,
                _ => 1,
            },
            _ => 1,
        }
    }

    /// Short label printed in front of the error line.
    pub fn label(&self) -> &'static str {
        match self {
            BuildError::MissingInterpreter { .. } => "MISSING INTERPRETER",
            BuildError::MissingSource(_) => "MISSING SOURCE",
            BuildError::EnvironmentCreation { .. } => "ENVIRONMENT CREATION FAILED",
            BuildError::EnvironmentActivation { .. } => "ENVIRONMENT ACTIVATION FAILED",
            BuildError::DependencyInstall { .. } => "DEPENDENCY INSTALLATION FAILED",
            BuildError::Packaging { .. } => "PACKAGING FAILED",
            BuildError::Cleanup { .. } => "CLEANUP FAILED",
            BuildError::InvalidTransition { .. } => "INTERNAL ERROR",
            BuildError::Report { .. } => "REPORT FAILED",
        }
    }
}

/// Top-level result type for the binary entry point.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
