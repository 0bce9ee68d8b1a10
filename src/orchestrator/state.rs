//! Build step tracking.
//!
//! The build is a linear chain of eight steps. Each step has exactly two
//! outgoing edges: proceed to the next step, or abort. There are no back-edges
//! and no retries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::error::BuildError;

/// Discrete steps of a build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildStep {
    /// Step 1: interpreter and source file are reachable
    InterpreterDiscovery,

    /// Step 2: old environment removed, fresh one created
    EnvironmentIsolation,

    /// Step 3: environment preferred for all later child processes
    EnvironmentActivation,

    /// Step 4: installer upgraded, libraries installed
    DependencyInstallation,

    /// Step 5: scratch directory, descriptors and old executable removed
    PreBuildCleanup,

    /// Step 6: packaging tool invoked
    Packaging,

    /// Step 7: environment and scratch directory removed
    PostBuildCleanup,

    /// Step 8: success banner printed
    SuccessReport,
}

impl BuildStep {
    pub const ALL: [BuildStep; 8] = [
        BuildStep::InterpreterDiscovery,
        BuildStep::EnvironmentIsolation,
        BuildStep::EnvironmentActivation,
        BuildStep::DependencyInstallation,
        BuildStep::PreBuildCleanup,
        BuildStep::Packaging,
        BuildStep::PostBuildCleanup,
        BuildStep::SuccessReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStep::InterpreterDiscovery => "interpreter-discovery",
            BuildStep::EnvironmentIsolation => "environment-isolation",
            BuildStep::EnvironmentActivation => "environment-activation",
            BuildStep::DependencyInstallation => "dependency-installation",
            BuildStep::PreBuildCleanup => "pre-build-cleanup",
            BuildStep::Packaging => "packaging",
            BuildStep::PostBuildCleanup => "post-build-cleanup",
            BuildStep::SuccessReport => "success-report",
        }
    }

    /// 1-based position in the chain.
    pub fn number(&self) -> usize {
        match self {
            BuildStep::InterpreterDiscovery => 1,
            BuildStep::EnvironmentIsolation => 2,
            BuildStep::EnvironmentActivation => 3,
            BuildStep::DependencyInstallation => 4,
            BuildStep::PreBuildCleanup => 5,
            BuildStep::Packaging => 6,
            BuildStep::PostBuildCleanup => 7,
            BuildStep::SuccessReport => 8,
        }
    }

    /// The proceed edge. `None` for the last step.
    pub fn next(&self) -> Option<BuildStep> {
        BuildStep::ALL.get(self.number()).copied()
    }

    /// Operator-facing counter group ("STEP x/4") this step is reported under.
    pub fn console_stage(&self) -> Option<usize> {
        match self {
            BuildStep::InterpreterDiscovery => Some(1),
            BuildStep::EnvironmentIsolation | BuildStep::EnvironmentActivation => Some(2),
            BuildStep::DependencyInstallation => Some(3),
            BuildStep::PreBuildCleanup | BuildStep::Packaging => Some(4),
            BuildStep::PostBuildCleanup | BuildStep::SuccessReport => None,
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Aborted(BuildStep),
}

/// Progress of a single build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Current step, or the step that aborted
    pub step: BuildStep,

    /// Set once a terminal state is reached
    pub outcome: Option<Outcome>,

    /// Steps that completed successfully, in order
    pub completed: Vec<BuildStep>,

    pub start_time: SystemTime,

    pub last_update_time: SystemTime,

    /// Error message if the run aborted
    pub error: Option<String>,
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationState {
    pub fn new() -> Self {
        let now = SystemTime::now();
        OrchestrationState {
            step: BuildStep::InterpreterDiscovery,
            outcome: None,
            completed: Vec::new(),
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Take the proceed edge to `next`.
    ///
    /// Only the immediate successor of the current step is accepted, and only
    /// while the run has not terminated.
    pub fn transition_to(&mut self, next: BuildStep) -> Result<(), BuildError> {
        if self.is_terminal() || self.step.next() != Some(next) {
            return Err(BuildError::InvalidTransition {
                from: self.step,
                to: next,
            });
        }
        self.completed.push(self.step);
        self.step = next;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Mark the final step complete and terminate with success.
    pub fn complete(&mut self) -> Result<(), BuildError> {
        if self.is_terminal() || self.step != BuildStep::SuccessReport {
            return Err(BuildError::InvalidTransition {
                from: self.step,
                to: BuildStep::SuccessReport,
            });
        }
        self.completed.push(self.step);
        self.outcome = Some(Outcome::Success);
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Take the abort edge from the current step.
    pub fn abort(&mut self, error: &BuildError) {
        if self.is_terminal() {
            return;
        }
        self.error = Some(error.to_string());
        self.outcome = Some(Outcome::Aborted(self.step));
        self.last_update_time = SystemTime::now();
    }
}
