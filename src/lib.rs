//! PDF Toolkit Builder
//!
//! Packages the `pdf_toolkit.py` desktop application into a single
//! self-contained executable. The build runs in the invocation directory,
//! inside a throwaway isolated Python environment, and leaves only the
//! executable behind on success.
//!
//! The system is organized into functional modules:
//! - **error**: Build and configuration error types
//! - **models**: Fixed file names, directory layout and packager options
//! - **config**: Optional settings file and environment overrides
//! - **orchestrator**: The 8-step build pipeline, its state machine and the
//!   external tool runner
//! - **log_collector**: Session log file behind the `log` facade
//! - **system**: Operator console (step counters, error lines, pause)
//! - **testutil**: Scripted tool runner for tests

// Core foundational modules
pub mod error;
pub mod models;

// Settings file and environment overrides
pub mod config;

// Operator console
pub mod system;

// Session log file
pub mod log_collector;

// Build pipeline
pub mod orchestrator;

#[doc(hidden)]
pub mod testutil;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{BuildError, ConfigError, Result};

pub use models::{BuildLayout, BuildReport, PackagerOptions, VenvLayout};

pub use config::{BuildSettings, SettingsManager};

pub use orchestrator::{
    BuildOrchestrator, BuildStep, Invocation, OrchestrationState, Outcome, PlannedAction,
    ProcessRunner, ToolExit, ToolRunner,
};

pub use system::Console;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
