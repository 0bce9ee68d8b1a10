//! Steps 5 and 7: artifact removal before and after packaging.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::models::BuildLayout;
use crate::orchestrator::state::BuildStep;

/// Remove a file or directory tree at `path`.
///
/// Returns `Ok(false)` when there was nothing to remove.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

/// Packaging descriptor files left in the invocation directory.
pub fn find_spec_files(layout: &BuildLayout) -> io::Result<Vec<PathBuf>> {
    let mut specs = Vec::new();
    for entry in fs::read_dir(&layout.root)? {
        let path = entry?.path();
        if path.is_file() && layout.is_spec_file(&path) {
            specs.push(path);
        }
    }
    specs.sort();
    Ok(specs)
}

fn remove_for_step(step: BuildStep, path: &Path, removed: &mut Vec<PathBuf>) -> Result<(), BuildError> {
    match remove_path(path) {
        Ok(true) => {
            log::info!("[Cleanup] Removed {}", path.display());
            removed.push(path.to_path_buf());
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(source) => Err(BuildError::Cleanup {
            step,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Clear everything a previous run may have left behind.
///
/// Removes the scratch directory, descriptor files and the old outputs
/// (executable and, on macOS, its app bundle).
/// Any removal failure is fatal: packaging must start from a clean slate.
pub fn clean_build_artifacts(layout: &BuildLayout) -> Result<Vec<PathBuf>, BuildError> {
    let step = BuildStep::PreBuildCleanup;
    let mut removed = Vec::new();

    remove_for_step(step, &layout.scratch_path(), &mut removed)?;

    let specs = find_spec_files(layout).map_err(|source| BuildError::Cleanup {
        step,
        path: layout.root.clone(),
        source,
    })?;
    for spec in specs {
        remove_for_step(step, &spec, &mut removed)?;
    }

    for output in layout.output_paths() {
        remove_for_step(step, &output, &mut removed)?;
    }

    log::info!("[Cleanup] Pre-build cleanup removed {} item(s)", removed.len());
    Ok(removed)
}

/// Remove the scratch directory and the isolated environment.
///
/// The environment must already be deactivated.
pub fn clean_after_build(layout: &BuildLayout) -> Result<Vec<PathBuf>, BuildError> {
    let step = BuildStep::PostBuildCleanup;
    let mut removed = Vec::new();
    remove_for_step(step, &layout.scratch_path(), &mut removed)?;
    remove_for_step(step, &layout.venv_path(), &mut removed)?;
    Ok(removed)
}
