//! Test utilities for the builder.
//!
//! [`ScriptedRunner`] stands in for the real interpreter, pip and PyInstaller.
//! It recognizes each build command, returns a scripted result, and on success
//! leaves behind the same files the real tool would (environment interpreter,
//! descriptor file, output executable).

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use crate::models::BuildLayout;
use crate::orchestrator::executor::{Invocation, ToolExit, ToolRunner};

/// The build commands the scripted runner recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Version,
    Venv,
    PipUpgrade,
    PipInstall,
    Package,
    Other,
}

impl ToolKind {
    pub fn classify(invocation: &Invocation) -> ToolKind {
        if invocation.has_arg("--version") {
            ToolKind::Version
        } else if invocation.has_arg("venv") {
            ToolKind::Venv
        } else if invocation.has_arg("pip") && invocation.has_arg("--upgrade") {
            ToolKind::PipUpgrade
        } else if invocation.has_arg("pip") && invocation.has_arg("install") {
            ToolKind::PipInstall
        } else if invocation.has_arg("PyInstaller") {
            ToolKind::Package
        } else {
            ToolKind::Other
        }
    }
}

/// Scripted result for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    /// Exit 0 and produce the tool's usual files
    Succeed,
    /// Exit 0 without producing any files
    SucceedWithoutArtifacts,
    /// Exit with the given non-zero code
    Fail(i32),
    /// The program cannot be started
    NotFound,
}

/// One recorded call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: ToolKind,
    pub invocation: Invocation,
    /// Whether any build output existed when the call started
    pub output_existed: bool,
}

/// Fake toolchain driven by per-tool scripts.
pub struct ScriptedRunner {
    layout: BuildLayout,
    scripts: HashMap<ToolKind, Script>,
    version_output: String,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    /// Every tool succeeds; the interpreter reports Python 3.11.4.
    pub fn new(layout: BuildLayout) -> Self {
        ScriptedRunner {
            layout,
            scripts: HashMap::new(),
            version_output: "Python 3.11.4".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(mut self, kind: ToolKind, script: Script) -> Self {
        self.scripts.insert(kind, script);
        self
    }

    pub fn with_version_output(mut self, output: &str) -> Self {
        self.version_output = output.to_string();
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<ToolKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }

    pub fn call_of(&self, kind: ToolKind) -> Option<RecordedCall> {
        self.calls().into_iter().find(|c| c.kind == kind)
    }

    fn produce_artifacts(&self, kind: ToolKind) -> std::io::Result<()> {
        match kind {
            ToolKind::Venv => {
                let venv = self.layout.venv();
                fs::create_dir_all(venv.bin_dir())?;
                fs::write(venv.interpreter(), b"#!python")?;
                fs::write(venv.root.join("pyvenv.cfg"), b"home = /usr/bin\n")?;
            }
            ToolKind::Package => {
                let scratch = self.layout.scratch_path();
                fs::create_dir_all(scratch.join("pdf_toolkit"))?;
                fs::write(scratch.join("pdf_toolkit.spec"), b"# generated\n")?;
                fs::write(self.layout.output_path(), b"MZ executable payload")?;
                if let Some(bundle) = self.layout.app_bundle_path() {
                    let macos = bundle.join("Contents").join("MacOS");
                    fs::create_dir_all(&macos)?;
                    fs::write(macos.join("pdf_toolkit"), b"bundled payload")?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn respond(&self, invocation: &Invocation) -> std::io::Result<ToolExit> {
        let kind = ToolKind::classify(invocation);
        let call = RecordedCall {
            kind,
            invocation: invocation.clone(),
            output_existed: self.layout.output_paths().iter().any(|p| p.exists()),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        match self.scripts.get(&kind).unwrap_or(&Script::Succeed) {
            Script::Succeed => {
                self.produce_artifacts(kind)?;
                let exit = ToolExit::success();
                if kind == ToolKind::Version {
                    Ok(exit.with_output(&[self.version_output.as_str()]))
                } else {
                    Ok(exit)
                }
            }
            Script::SucceedWithoutArtifacts => Ok(ToolExit::success()),
            Script::Fail(code) => Ok(ToolExit::failure(*code).with_output(&["simulated failure"])),
            Script::NotFound => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "program not found",
            )),
        }
    }
}

impl ToolRunner for ScriptedRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> BoxFuture<'a, std::io::Result<ToolExit>> {
        Box::pin(async move { self.respond(invocation) })
    }
}

/// Create the application entry point inside `layout.root`.
pub fn write_source(layout: &BuildLayout) -> std::io::Result<()> {
    fs::write(layout.source_path(), b"print('pdf toolkit')\n")
}
