//! Settings file loader and serialization.

use crate::config::BuildSettings;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-user session log directory: <data dir>/pdf-toolkit-builder/logs
///
/// Logs never go to the invocation directory, which must only gain the
/// executable.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("pdf-toolkit-builder").join("logs"))
}

/// Load settings from a JSON file.
pub fn load_settings_from_file(path: &Path) -> Result<BuildSettings, ConfigError> {
    validate_settings_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!("Settings file not found at: {}", path.display()))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let settings: BuildSettings = serde_json::from_str(&content).map_err(ConfigError::InvalidJson)?;

    Ok(settings)
}

/// Validate settings path (.json extension required).
pub fn validate_settings_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Settings path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "json" => {}
        Some(ext) => {
            return Err(ConfigError::ValidationFailed(format!(
                "Settings file must have .json extension, got .{}",
                ext.to_string_lossy()
            )))
        }
        None => {
            return Err(ConfigError::ValidationFailed(
                "Settings file must have .json extension".to_string(),
            ))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_serialized_settings_load_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pdf_toolkit_build.json");

        let mut original = BuildSettings::default();
        original.interpreter = "py".to_string();
        original.packages = vec!["pypdf".to_string(), "pyinstaller".to_string()];
        original.pause_on_failure = false;
        original.log_dir = Some(temp_dir.path().join("logs"));

        fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();
        let loaded = load_settings_from_file(&path).expect("Failed to load settings");

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_validate_settings_path() {
        assert!(validate_settings_path(Path::new("pdf_toolkit_build.json")).is_ok());
        assert!(validate_settings_path(Path::new("settings.toml")).is_err());
        assert!(validate_settings_path(Path::new("settings")).is_err());
        assert!(validate_settings_path(Path::new("")).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_settings_from_file(Path::new("/nonexistent/path/settings.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
