//! Steps 2-3: isolated environment creation and activation.
//!
//! Activation is process-scoped: an [`ActiveEnvironment`] only changes the
//! environment of child processes launched through it. Nothing is exported to
//! the parent shell and nothing outlives the run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::cleanup::remove_path;
use crate::error::BuildError;
use crate::models::{BuildLayout, VenvLayout};
use crate::orchestrator::executor::{Invocation, ToolRunner};

/// Remove any previous environment directory and create a fresh one.
///
/// The old directory is removed regardless of its state (healthy, corrupted,
/// or a plain file squatting on the name).
pub async fn isolate_environment(
    runner: &dyn ToolRunner,
    interpreter: &str,
    layout: &BuildLayout,
) -> Result<(), BuildError> {
    let venv_path = layout.venv_path();

    match remove_path(&venv_path) {
        Ok(true) => log::info!(
            "[Environment] Removed previous environment at {}",
            venv_path.display()
        ),
        Ok(false) => {}
        Err(e) => {
            return Err(BuildError::EnvironmentCreation {
                reason: format!(
                    "could not remove previous environment {}: {}",
                    venv_path.display(),
                    e
                ),
                exit_code: None,
            })
        }
    }

    let invocation = Invocation::new(interpreter, &layout.root)
        .arg("-m")
        .arg("venv")
        .arg(&venv_path);

    let exit = runner
        .run(&invocation)
        .await
        .map_err(|e| BuildError::EnvironmentCreation {
            reason: format!("'{}' could not be started: {}", interpreter, e),
            exit_code: None,
        })?;

    if !exit.success {
        return Err(BuildError::EnvironmentCreation {
            reason: format!("'{} -m venv' {}", interpreter, exit.describe()),
            exit_code: exit.code,
        });
    }

    log::info!("[Environment] Created environment at {}", venv_path.display());
    Ok(())
}

fn prepended_path(venv: &VenvLayout) -> Result<OsString, std::env::JoinPathsError> {
    let current = std::env::var_os("PATH").unwrap_or_default();
    std::env::join_paths(std::iter::once(venv.bin_dir()).chain(std::env::split_paths(&current)))
}

/// Child-process overrides that make the isolated environment win over any
/// global installation.
#[derive(Debug, Clone)]
pub struct ActiveEnvironment {
    venv: VenvLayout,
    path_value: OsString,
    active: bool,
}

impl ActiveEnvironment {
    /// Activate the environment at `layout.venv_path()`.
    ///
    /// Fails if the environment has no interpreter, which means creation did
    /// not actually produce a usable environment.
    pub fn activate(layout: &BuildLayout) -> Result<Self, BuildError> {
        let venv = layout.venv();
        let python = venv.interpreter();
        if !python.is_file() {
            return Err(BuildError::EnvironmentActivation {
                reason: format!(
                    "environment interpreter missing at {}",
                    python.display()
                ),
            });
        }

        let path_value = prepended_path(&venv).map_err(|e| BuildError::EnvironmentActivation {
            reason: format!("could not build PATH for the environment: {}", e),
        })?;

        log::info!("[Environment] Activated {}", venv.root.display());
        Ok(ActiveEnvironment {
            venv,
            path_value,
            active: true,
        })
    }

    /// The environment as it will look once created, for planning.
    ///
    /// Does not touch the filesystem.
    pub fn planned(layout: &BuildLayout) -> Self {
        let venv = layout.venv();
        let path_value =
            prepended_path(&venv).unwrap_or_else(|_| venv.bin_dir().into_os_string());
        ActiveEnvironment {
            venv,
            path_value,
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The environment's own interpreter.
    pub fn python(&self) -> PathBuf {
        self.venv.interpreter()
    }

    /// `python -m <module>` run inside the environment.
    pub fn module(&self, module: &str, current_dir: &Path) -> Invocation {
        self.apply(
            Invocation::new(self.python(), current_dir)
                .arg("-m")
                .arg(module),
        )
    }

    /// Attach the activation overrides to `invocation`.
    ///
    /// A deactivated environment leaves the invocation untouched.
    pub fn apply(&self, invocation: Invocation) -> Invocation {
        if !self.active {
            return invocation;
        }
        invocation
            .env("VIRTUAL_ENV", &self.venv.root)
            .env("PATH", &self.path_value)
            .env_remove("PYTHONHOME")
    }

    /// Stop applying overrides. Idempotent.
    pub fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            log::info!("[Environment] Deactivated {}", self.venv.root.display());
        }
    }
}
