//! Step 4: installer upgrade and library installation.

use crate::error::BuildError;
use crate::models::BuildLayout;
use crate::orchestrator::executor::{Invocation, ToolRunner};

use super::environment::ActiveEnvironment;

/// `python -m pip install --upgrade pip` inside the environment.
pub fn pip_upgrade_invocation(env: &ActiveEnvironment, layout: &BuildLayout) -> Invocation {
    env.module("pip", &layout.root)
        .args(["install", "--upgrade", "pip"])
}

/// `python -m pip install <packages>` inside the environment.
pub fn pip_install_invocation(
    env: &ActiveEnvironment,
    layout: &BuildLayout,
    packages: &[String],
) -> Invocation {
    env.module("pip", &layout.root)
        .arg("install")
        .args(packages)
}

async fn run_pip(runner: &dyn ToolRunner, invocation: &Invocation, what: &str) -> Result<(), BuildError> {
    let exit = runner
        .run(invocation)
        .await
        .map_err(|e| BuildError::DependencyInstall {
            reason: format!("{} could not be started: {}", what, e),
            exit_code: None,
        })?;

    if !exit.success {
        if let Some(last) = exit.output_tail.last() {
            log::error!("[Dependencies] Last pip output: {}", last);
        }
        return Err(BuildError::DependencyInstall {
            reason: format!("{} {}", what, exit.describe()),
            exit_code: exit.code,
        });
    }
    Ok(())
}

/// Upgrade pip, then install `packages` into the active environment.
pub async fn install_dependencies(
    runner: &dyn ToolRunner,
    env: &ActiveEnvironment,
    layout: &BuildLayout,
    packages: &[String],
) -> Result<(), BuildError> {
    run_pip(runner, &pip_upgrade_invocation(env, layout), "pip upgrade").await?;
    log::info!("[Dependencies] pip upgraded");

    run_pip(
        runner,
        &pip_install_invocation(env, layout, packages),
        "pip install",
    )
    .await?;
    log::info!("[Dependencies] Installed: {}", packages.join(", "));
    Ok(())
}
