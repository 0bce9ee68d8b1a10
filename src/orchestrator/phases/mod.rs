//! Orchestrator phases: the build pipeline split into independently testable stages.
//!
//! - **prerequisites** - interpreter discovery and source file check (step 1)
//! - **environment** - isolated environment creation and activation (steps 2-3)
//! - **dependencies** - installer upgrade and library installation (step 4)
//! - **cleanup** - artifact removal before and after the build (steps 5, 7)
//! - **packaging** - one-file packager invocation (step 6)
//!
//! Each phase takes the [`ToolRunner`](super::executor::ToolRunner) explicitly so
//! the whole pipeline can run against a scripted runner in tests.

pub mod cleanup;
pub mod dependencies;
pub mod environment;
pub mod packaging;
pub mod prerequisites;

pub use cleanup::{clean_after_build, clean_build_artifacts, find_spec_files, remove_path};
pub use dependencies::install_dependencies;
pub use environment::{isolate_environment, ActiveEnvironment};
pub use packaging::package_executable;
pub use prerequisites::{check_source, discover_interpreter, InterpreterInfo};
