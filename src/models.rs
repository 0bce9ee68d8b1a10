//! Core data types for the PDF Toolkit builder.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Application entry point packaged by the build.
pub const SOURCE_FILE: &str = "pdf_toolkit.py";

/// Isolated environment directory, relative to the invocation directory.
pub const VENV_DIR: &str = "build_venv";

/// Packager scratch directory (work and spec output).
pub const SCRATCH_DIR: &str = "build";

/// Extension of the packaging descriptor files the packager emits.
pub const SPEC_EXTENSION: &str = "spec";

/// Base name of the produced executable.
pub const OUTPUT_STEM: &str = "pdf_toolkit";

/// Libraries installed into the isolated environment, in install order.
pub const DEFAULT_PACKAGES: &[&str] = &[
    "pypdf",
    "pillow",
    "reportlab",
    "pymupdf",
    "pyinstaller",
    "cryptography",
];

/// PyMuPDF is imported as `fitz`, which the packager cannot discover on its own.
pub const DEFAULT_HIDDEN_IMPORTS: &[&str] = &["fitz"];

/// Default interpreter command looked up on PATH.
pub fn default_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// Executable file name for the current platform.
pub fn executable_name(stem: &str) -> String {
    format!("{}{}", stem, std::env::consts::EXE_SUFFIX)
}

/// Application bundle the packager adds next to a windowed one-file build.
///
/// Only macOS gets one; elsewhere the executable is the whole output.
pub fn app_bundle_name(stem: &str) -> Option<String> {
    if cfg!(target_os = "macos") {
        Some(format!("{}.app", stem))
    } else {
        None
    }
}

/// Fixed set of file and directory names the build works with.
///
/// Every path is resolved against `root`, the invocation directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLayout {
    pub root: PathBuf,
    pub source_file: String,
    pub venv_dir: String,
    pub scratch_dir: String,
    pub spec_extension: String,
    pub output_name: String,
    /// Bundle produced alongside the executable, if the platform has one
    pub app_bundle: Option<String>,
}

impl BuildLayout {
    /// Layout with the standard names, rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BuildLayout {
            root: root.into(),
            source_file: SOURCE_FILE.to_string(),
            venv_dir: VENV_DIR.to_string(),
            scratch_dir: SCRATCH_DIR.to_string(),
            spec_extension: SPEC_EXTENSION.to_string(),
            output_name: executable_name(OUTPUT_STEM),
            app_bundle: app_bundle_name(OUTPUT_STEM),
        }
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.join(&self.source_file)
    }

    pub fn venv_path(&self) -> PathBuf {
        self.root.join(&self.venv_dir)
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.root.join(&self.scratch_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output_name)
    }

    pub fn app_bundle_path(&self) -> Option<PathBuf> {
        self.app_bundle.as_ref().map(|name| self.root.join(name))
    }

    /// Everything a successful packaging run leaves in the invocation
    /// directory: the executable, then the app bundle where there is one.
    pub fn output_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.output_path()];
        paths.extend(self.app_bundle_path());
        paths
    }

    /// Whether `path` is a packaging descriptor file.
    pub fn is_spec_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext == self.spec_extension.as_str())
            .unwrap_or(false)
    }

    pub fn venv(&self) -> VenvLayout {
        VenvLayout::new(self.venv_path())
    }
}

/// Directory structure of a created virtual environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvLayout {
    pub root: PathBuf,
}

impl VenvLayout {
    pub fn new(root: PathBuf) -> Self {
        VenvLayout { root }
    }

    /// `Scripts` on Windows, `bin` everywhere else.
    pub fn bin_dir(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("Scripts")
        } else {
            self.root.join("bin")
        }
    }

    pub fn interpreter(&self) -> PathBuf {
        self.bin_dir().join(executable_name("python"))
    }
}

/// PyInstaller invocation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagerOptions {
    pub onefile: bool,
    pub windowed: bool,
    pub noconfirm: bool,
    pub clean: bool,
    pub hidden_imports: Vec<String>,
    pub dist_path: PathBuf,
    pub work_path: PathBuf,
    pub spec_path: PathBuf,
    pub name: String,
    pub source: PathBuf,
}

impl PackagerOptions {
    /// Single-file, windowed, clean, unattended build for `layout`.
    pub fn for_layout(layout: &BuildLayout, hidden_imports: &[String]) -> Self {
        PackagerOptions {
            onefile: true,
            windowed: true,
            noconfirm: true,
            clean: true,
            hidden_imports: hidden_imports.to_vec(),
            dist_path: layout.root.clone(),
            work_path: layout.scratch_path(),
            spec_path: layout.scratch_path(),
            name: OUTPUT_STEM.to_string(),
            source: layout.source_path(),
        }
    }

    /// Render the arguments following `python -m PyInstaller`.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if self.onefile {
            args.push("--onefile".into());
        }
        if self.windowed {
            args.push("--windowed".into());
        }
        if self.noconfirm {
            args.push("--noconfirm".into());
        }
        if self.clean {
            args.push("--clean".into());
        }
        for import in &self.hidden_imports {
            args.push("--hidden-import".into());
            args.push(import.into());
        }
        args.push("--name".into());
        args.push(self.name.clone().into());
        args.push("--distpath".into());
        args.push(self.dist_path.clone().into_os_string());
        args.push("--workpath".into());
        args.push(self.work_path.clone().into_os_string());
        args.push("--specpath".into());
        args.push(self.spec_path.clone().into_os_string());
        args.push(self.source.clone().into_os_string());
        args
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub executable: PathBuf,
    pub size_bytes: u64,
    pub elapsed_ms: u128,
    pub interpreter_version: Option<String>,
}
