//! Build settings.
//!
//! The builder takes no command-line arguments. Its behavior can be adjusted
//! with an optional `pdf_toolkit_build.json` in the invocation directory and a
//! few environment variables:
//!
//! - `PDF_TOOLKIT_BUILD_PYTHON` - interpreter command to use
//! - `PDF_TOOLKIT_BUILD_NO_PAUSE` - never wait for Enter after a failure
//! - `PDF_TOOLKIT_BUILD_DRY_RUN` - print the plan and stop before step 2
//!
//! Environment variables win over the settings file, which wins over defaults.
//! The two flags count as set unless empty, `0`, `false`, `no` or `off`.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::models::{default_interpreter, DEFAULT_HIDDEN_IMPORTS, DEFAULT_PACKAGES};

/// Settings file name, looked up in the invocation directory.
pub const SETTINGS_FILE: &str = "pdf_toolkit_build.json";

pub const ENV_PYTHON: &str = "PDF_TOOLKIT_BUILD_PYTHON";
pub const ENV_NO_PAUSE: &str = "PDF_TOOLKIT_BUILD_NO_PAUSE";
pub const ENV_DRY_RUN: &str = "PDF_TOOLKIT_BUILD_DRY_RUN";

/// Whether a flag variable's value turns the flag on.
pub fn flag_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => false,
        Some(v) => !(v.is_empty()
            || v == "0"
            || v.eq_ignore_ascii_case("false")
            || v.eq_ignore_ascii_case("no")
            || v.eq_ignore_ascii_case("off")),
    }
}

/// Whether to pause after a failure that happened before settings existed.
///
/// Only the environment can opt out at that point.
pub fn pause_without_settings<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    !flag_enabled(lookup(ENV_NO_PAUSE).as_deref())
}

/// Everything about a build that is not a fixed file name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Interpreter command used for discovery and environment creation
    pub interpreter: String,

    /// Libraries installed into the isolated environment
    pub packages: Vec<String>,

    /// Modules declared to the packager as hidden imports
    pub hidden_imports: Vec<String>,

    /// Wait for operator acknowledgment after a failure (terminal only)
    pub pause_on_failure: bool,

    /// Mirror tool output to the console
    pub echo_tool_output: bool,

    /// Print the plan instead of building
    pub dry_run: bool,

    /// Session log directory; defaults to the per-user data directory
    pub log_dir: Option<PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            interpreter: default_interpreter().to_string(),
            packages: DEFAULT_PACKAGES.iter().map(|p| p.to_string()).collect(),
            hidden_imports: DEFAULT_HIDDEN_IMPORTS.iter().map(|p| p.to_string()).collect(),
            pause_on_failure: true,
            echo_tool_output: true,
            dry_run: false,
            log_dir: None,
        }
    }
}

impl BuildSettings {
    /// Reject settings that cannot produce a build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interpreter.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "interpreter cannot be empty".to_string(),
            ));
        }
        if self.packages.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "package list cannot be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .packages
            .iter()
            .chain(self.hidden_imports.iter())
            .find(|p| p.trim().is_empty() || p.contains(char::is_whitespace))
        {
            return Err(ConfigError::ValidationFailed(format!(
                "invalid package or module name: {:?}",
                bad
            )));
        }
        Ok(())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(python) = lookup(ENV_PYTHON).filter(|v| !v.trim().is_empty()) {
            log::info!("[Config] Interpreter overridden by {}: {}", ENV_PYTHON, python);
            self.interpreter = python;
        }
        if flag_enabled(lookup(ENV_NO_PAUSE).as_deref()) {
            self.pause_on_failure = false;
        }
        if flag_enabled(lookup(ENV_DRY_RUN).as_deref()) {
            self.dry_run = true;
        }
    }

    /// Log directory to use, falling back to the per-user default.
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(loader::default_log_dir)
    }
}

/// Loads settings for a build rooted at a given directory.
pub struct SettingsManager;

impl SettingsManager {
    /// Settings for a build in `root`: file (if any), then process environment.
    pub fn load(root: &Path) -> Result<BuildSettings, ConfigError> {
        Self::load_with(root, |key| std::env::var(key).ok())
    }

    /// Same as [`SettingsManager::load`] with an explicit environment lookup.
    pub fn load_with<F>(root: &Path, lookup: F) -> Result<BuildSettings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = root.join(SETTINGS_FILE);
        let mut settings = if path.is_file() {
            log::info!("[Config] Loading settings from {}", path.display());
            loader::load_settings_from_file(&path)?
        } else {
            BuildSettings::default()
        };

        settings.apply_overrides(lookup);
        settings.validate()?;
        Ok(settings)
    }
}
