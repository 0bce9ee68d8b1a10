//! Step 6: one-file packaging.
//!
//! PyInstaller runs inside the active environment in single-file, windowed,
//! clean, unattended mode. The executable lands in the invocation directory;
//! work files and the generated `.spec` go to the scratch directory.

use std::path::PathBuf;

use super::environment::ActiveEnvironment;
use crate::error::BuildError;
use crate::models::{BuildLayout, PackagerOptions};
use crate::orchestrator::executor::{Invocation, ToolRunner};

/// Module name the packager is launched as (`python -m PyInstaller`).
pub const PACKAGER_MODULE: &str = "PyInstaller";

pub fn packaging_invocation(
    env: &ActiveEnvironment,
    layout: &BuildLayout,
    hidden_imports: &[String],
) -> Invocation {
    let options = PackagerOptions::for_layout(layout, hidden_imports);
    env.module(PACKAGER_MODULE, &layout.root)
        .args(options.to_args())
}

/// Run the packager and confirm the executable was produced.
pub async fn package_executable(
    runner: &dyn ToolRunner,
    env: &ActiveEnvironment,
    layout: &BuildLayout,
    hidden_imports: &[String],
) -> Result<PathBuf, BuildError> {
    let invocation = packaging_invocation(env, layout, hidden_imports);

    let exit = runner
        .run(&invocation)
        .await
        .map_err(|e| BuildError::Packaging {
            reason: format!("PyInstaller could not be started: {}", e),
            exit_code: None,
        })?;

    if !exit.success {
        return Err(BuildError::Packaging {
            reason: format!("PyInstaller {}", exit.describe()),
            exit_code: exit.code,
        });
    }

    let output = layout.output_path();
    if !output.is_file() {
        return Err(BuildError::Packaging {
            reason: format!(
                "PyInstaller reported success but {} was not produced",
                output.display()
            ),
            exit_code: None,
        });
    }

    log::info!("[Packaging] Produced {}", output.display());
    Ok(output)
}
