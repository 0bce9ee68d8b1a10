//! Build orchestration: the 8-step pipeline that turns `pdf_toolkit.py` into a
//! single-file executable.
//!
//! ```text
//! InterpreterDiscovery -> EnvironmentIsolation -> EnvironmentActivation
//!   -> DependencyInstallation -> PreBuildCleanup -> Packaging
//!   -> PostBuildCleanup -> SuccessReport
//! ```
//!
//! Every step either proceeds or aborts the run. On abort the environment is
//! deactivated and everything on disk is left as it is for inspection.

pub mod executor;
pub mod phases;
pub mod state;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub use executor::{Invocation, ProcessRunner, ToolExit, ToolRunner};
pub use state::{BuildStep, OrchestrationState, Outcome};

use crate::config::BuildSettings;
use crate::error::BuildError;
use crate::models::{BuildLayout, BuildReport};
use crate::system::Console;
use phases::dependencies::{pip_install_invocation, pip_upgrade_invocation};
use phases::packaging::packaging_invocation;
use phases::{
    check_source, clean_after_build, clean_build_artifacts, discover_interpreter,
    find_spec_files, install_dependencies, isolate_environment, package_executable,
    ActiveEnvironment,
};

/// Operator-facing title of each "STEP x/4" group.
fn stage_title(stage: usize) -> &'static str {
    match stage {
        1 => "Checking for Python",
        2 => "Creating isolated build environment",
        3 => "Installing dependencies",
        _ => "Building executable",
    }
}

/// Something a build would do, as reported by a dry run.
#[derive(Debug, Clone)]
pub enum PlannedAction {
    Run { step: BuildStep, invocation: Invocation },
    Remove { step: BuildStep, path: PathBuf },
}

impl PlannedAction {
    pub fn step(&self) -> BuildStep {
        match self {
            PlannedAction::Run { step, .. } | PlannedAction::Remove { step, .. } => *step,
        }
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedAction::Run { step, invocation } => {
                write!(f, "[{}] run: {}", step, invocation)
            }
            PlannedAction::Remove { step, path } => {
                write!(f, "[{}] remove: {}", step, path.display())
            }
        }
    }
}

/// Runs one build in one invocation directory.
pub struct BuildOrchestrator {
    layout: BuildLayout,
    settings: BuildSettings,
    runner: Arc<dyn ToolRunner>,
    console: Console,
    state: OrchestrationState,
    environment: Option<ActiveEnvironment>,
    last_stage: Option<usize>,
}

impl BuildOrchestrator {
    pub fn new(layout: BuildLayout, settings: BuildSettings, runner: Arc<dyn ToolRunner>) -> Self {
        BuildOrchestrator {
            layout,
            settings,
            runner,
            console: Console::terminal(),
            state: OrchestrationState::new(),
            environment: None,
            last_stage: None,
        }
    }

    /// Send operator output somewhere other than the terminal.
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Snapshot of the run's progress for inspection.
    pub fn state_snapshot(&self) -> OrchestrationState {
        self.state.clone()
    }

    /// Execute all eight steps. Stops at the first failure.
    pub async fn run(&mut self) -> Result<BuildReport, BuildError> {
        self.state = OrchestrationState::new();
        self.environment = None;
        self.last_stage = None;

        log::info!("[Build] Starting build in {}", self.layout.root.display());
        let started = Instant::now();

        match self.run_steps(started).await {
            Ok(report) => {
                log::info!("[Build] [SUCCESS] {}", report.executable.display());
                Ok(report)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn run_steps(&mut self, started: Instant) -> Result<BuildReport, BuildError> {
        // Step 1
        self.enter(BuildStep::InterpreterDiscovery)?;
        let info = discover_interpreter(
            self.runner.as_ref(),
            &self.settings.interpreter,
            &self.layout,
        )
        .await?;
        check_source(&self.layout)?;
        match info.version_string() {
            Some(version) => self.console.detail(&format!("Python {} found", version)),
            None => self.console.detail(&format!("'{}' found", info.command)),
        }

        // Step 2
        self.enter(BuildStep::EnvironmentIsolation)?;
        isolate_environment(self.runner.as_ref(), &self.settings.interpreter, &self.layout)
            .await?;
        self.console
            .detail(&format!("Created {}", self.layout.venv_path().display()));

        // Step 3
        self.enter(BuildStep::EnvironmentActivation)?;
        let env = ActiveEnvironment::activate(&self.layout)?;
        self.environment = Some(env.clone());
        self.console.detail("Environment activated");

        // Step 4
        self.enter(BuildStep::DependencyInstallation)?;
        install_dependencies(
            self.runner.as_ref(),
            &env,
            &self.layout,
            &self.settings.packages,
        )
        .await?;
        self.console.detail(&format!(
            "Installed {}",
            self.settings.packages.join(", ")
        ));

        // Step 5
        self.enter(BuildStep::PreBuildCleanup)?;
        let removed = clean_build_artifacts(&self.layout)?;
        if !removed.is_empty() {
            self.console.detail(&format!(
                "Removed {} stale artifact(s) from a previous build",
                removed.len()
            ));
        }

        // Step 6
        self.enter(BuildStep::Packaging)?;
        let executable = package_executable(
            self.runner.as_ref(),
            &env,
            &self.layout,
            &self.settings.hidden_imports,
        )
        .await?;

        // Step 7
        self.enter(BuildStep::PostBuildCleanup)?;
        if let Some(active) = self.environment.as_mut() {
            active.deactivate();
        }
        clean_after_build(&self.layout)?;
        self.console.detail("Temporary build files removed");

        // Step 8
        self.enter(BuildStep::SuccessReport)?;
        let size_bytes = std::fs::metadata(&executable)
            .map_err(|source| BuildError::Report {
                path: executable.clone(),
                source,
            })?
            .len();
        let report = BuildReport {
            executable,
            size_bytes,
            elapsed_ms: started.elapsed().as_millis(),
            interpreter_version: info.version_string(),
        };
        self.console.success(&report);
        self.state.complete()?;
        Ok(report)
    }

    /// Take the proceed edge into `step` and announce it.
    fn enter(&mut self, step: BuildStep) -> Result<(), BuildError> {
        if self.state.step != step {
            self.state.transition_to(step)?;
        }
        log::info!(
            "[Build] [{}] Step {}/{}",
            step.as_str().to_uppercase(),
            step.number(),
            BuildStep::ALL.len()
        );

        if let Some(stage) = step.console_stage() {
            if self.last_stage != Some(stage) {
                self.console.step(stage, stage_title(stage));
                self.last_stage = Some(stage);
            }
        }
        Ok(())
    }

    /// Take the abort edge. Artifacts stay on disk.
    fn fail(&mut self, err: &BuildError) {
        self.state.abort(err);
        if let Some(active) = self.environment.as_mut() {
            active.deactivate();
        }

        let step = self.state.step;
        log::error!(
            "[Build] [{}] ✗ {} (exit code {})",
            step.as_str().to_uppercase(),
            err,
            err.exit_code()
        );
        for retained in [self.layout.venv_path(), self.layout.scratch_path()] {
            if retained.exists() {
                log::info!("[Build] Retained {} for inspection", retained.display());
            }
        }

        self.console.error(err.label(), &err.to_string(), err.hint());
    }

    /// Every command the build would run and every path it would remove,
    /// in order. Reads the filesystem but changes nothing.
    pub fn plan(&self) -> Vec<PlannedAction> {
        let layout = &self.layout;
        let interpreter = &self.settings.interpreter;
        let env = ActiveEnvironment::planned(layout);
        let mut actions = Vec::new();

        actions.push(PlannedAction::Run {
            step: BuildStep::InterpreterDiscovery,
            invocation: Invocation::new(interpreter, &layout.root).arg("--version"),
        });

        if layout.venv_path().symlink_metadata().is_ok() {
            actions.push(PlannedAction::Remove {
                step: BuildStep::EnvironmentIsolation,
                path: layout.venv_path(),
            });
        }
        actions.push(PlannedAction::Run {
            step: BuildStep::EnvironmentIsolation,
            invocation: Invocation::new(interpreter, &layout.root)
                .arg("-m")
                .arg("venv")
                .arg(layout.venv_path()),
        });

        actions.push(PlannedAction::Run {
            step: BuildStep::DependencyInstallation,
            invocation: pip_upgrade_invocation(&env, layout),
        });
        actions.push(PlannedAction::Run {
            step: BuildStep::DependencyInstallation,
            invocation: pip_install_invocation(&env, layout, &self.settings.packages),
        });

        let mut stale = vec![layout.scratch_path()];
        stale.extend(find_spec_files(layout).unwrap_or_default());
        stale.extend(layout.output_paths());
        for path in stale.into_iter().filter(|p| p.exists()) {
            actions.push(PlannedAction::Remove {
                step: BuildStep::PreBuildCleanup,
                path,
            });
        }

        actions.push(PlannedAction::Run {
            step: BuildStep::Packaging,
            invocation: packaging_invocation(&env, layout, &self.settings.hidden_imports),
        });

        for path in [layout.scratch_path(), layout.venv_path()] {
            actions.push(PlannedAction::Remove {
                step: BuildStep::PostBuildCleanup,
                path,
            });
        }

        actions
    }

    /// Print the plan without executing or removing anything.
    pub fn dry_run(&mut self) -> Vec<PlannedAction> {
        log::info!("[Build] [DRY-RUN] Dry run requested, nothing will be executed");
        self.console
            .info("DRY RUN: listing build actions, nothing will be executed or removed");

        if !self.layout.source_path().is_file() {
            self.console.detail(&format!(
                "warning: {} does not exist yet",
                self.layout.source_path().display()
            ));
        }

        let actions = self.plan();
        for action in &actions {
            log::info!("[Build] [DRY-RUN] {}", action);
            self.console.detail(&action.to_string());
        }
        actions
    }
}
