//! End-to-end tests for the build pipeline, driven by the scripted toolchain.
//!
//! Test Organization:
//! - Successful runs and reruns
//! - Pre-existing environment and executable handling
//! - Failure injection at each external tool
//! - Retention of artifacts on failure
//! - Dry run

use pdf_toolkit_builder::testutil::{write_source, Script, ScriptedRunner, ToolKind};
use pdf_toolkit_builder::{
    BuildError, BuildLayout, BuildOrchestrator, BuildSettings, BuildStep, Console, Outcome,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    layout: BuildLayout,
    runner: Arc<ScriptedRunner>,
    orchestrator: BuildOrchestrator,
}

fn fixture_with(configure: impl FnOnce(ScriptedRunner) -> ScriptedRunner) -> Fixture {
    fixture_for(|layout| layout, configure)
}

fn fixture_for(
    adjust: impl FnOnce(BuildLayout) -> BuildLayout,
    configure: impl FnOnce(ScriptedRunner) -> ScriptedRunner,
) -> Fixture {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let layout = adjust(BuildLayout::new(temp.path()));
    write_source(&layout).expect("Failed to write source");

    let runner = Arc::new(configure(ScriptedRunner::new(layout.clone())));
    let orchestrator =
        BuildOrchestrator::new(layout.clone(), BuildSettings::default(), runner.clone())
            .with_console(Console::captured());

    Fixture {
        _temp: temp,
        layout,
        runner,
        orchestrator,
    }
}

fn fixture() -> Fixture {
    fixture_with(|runner| runner)
}

fn output_names(layout: &BuildLayout) -> Vec<String> {
    layout
        .output_paths()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

fn dir_entries(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn test_scenario_a_only_the_executable_is_added() {
    let mut fx = fixture();
    let before = dir_entries(&fx.layout.root);

    let report = fx.orchestrator.run().await.expect("build should succeed");

    let after = dir_entries(&fx.layout.root);
    let added: BTreeSet<_> = after.difference(&before).cloned().collect();
    let expected: BTreeSet<String> = output_names(&fx.layout).into_iter().collect();
    assert_eq!(added, expected);
    assert!(before.is_subset(&after), "nothing pre-existing may disappear");

    assert!(!fx.layout.venv_path().exists());
    assert!(!fx.layout.scratch_path().exists());
    assert_eq!(report.executable, fx.layout.output_path());

    let console = fx.orchestrator.console().contents();
    assert!(console.contains("BUILD SUCCESSFUL"));
    assert!(console.contains(&fx.layout.output_name));
}

#[tokio::test]
async fn test_two_successive_runs_are_idempotent() {
    let mut fx = fixture();

    let first = fx.orchestrator.run().await.unwrap();
    let first_entries = dir_entries(&fx.layout.root);
    let first_bytes = fs::read(&first.executable).unwrap();

    let second = fx.orchestrator.run().await.unwrap();
    let second_entries = dir_entries(&fx.layout.root);
    let second_bytes = fs::read(&second.executable).unwrap();

    assert_eq!(first.executable, second.executable);
    assert_eq!(first_entries, second_entries);
    assert_eq!(first_bytes, second_bytes);
    assert!(!fx.layout.venv_path().exists());
    assert!(!fx.layout.scratch_path().exists());
}

#[tokio::test]
async fn test_commands_run_in_order_inside_the_environment() {
    let mut fx = fixture();
    fx.orchestrator.run().await.unwrap();

    let calls = fx.runner.calls();
    let kinds: Vec<ToolKind> = calls.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ToolKind::Version,
            ToolKind::Venv,
            ToolKind::PipUpgrade,
            ToolKind::PipInstall,
            ToolKind::Package,
        ]
    );

    let venv_python = fx.layout.venv().interpreter().into_os_string();
    for call in &calls[2..] {
        assert_eq!(call.invocation.program, venv_python);
        assert!(call.invocation.env_value("VIRTUAL_ENV").is_some());
    }
    // Global interpreter for discovery and creation
    for call in &calls[..2] {
        assert!(call.invocation.env.is_empty());
    }

    let install = fx.runner.call_of(ToolKind::PipInstall).unwrap();
    for package in ["pypdf", "pillow", "reportlab", "pymupdf", "pyinstaller", "cryptography"] {
        assert!(install.invocation.has_arg(package), "missing {}", package);
    }
}

// ============================================================================
// Pre-existing state
// ============================================================================

#[tokio::test]
async fn test_preexisting_environment_is_replaced() {
    // Fail after step 2 so the recreated environment can be inspected
    let mut fx = fixture_with(|r| r.with_script(ToolKind::PipUpgrade, Script::Fail(1)));
    fs::create_dir_all(fx.layout.venv_path().join("Lib").join("site-packages")).unwrap();
    fs::write(fx.layout.venv_path().join("stale-marker"), "old").unwrap();

    fx.orchestrator.run().await.unwrap_err();

    assert!(fx.layout.venv().interpreter().is_file());
    assert!(!fx.layout.venv_path().join("stale-marker").exists());
    assert!(!fx.layout.venv_path().join("Lib").exists());
}

#[tokio::test]
async fn test_plain_file_named_like_environment_is_replaced() {
    let mut fx = fixture();
    fs::write(fx.layout.venv_path(), "not an environment").unwrap();

    fx.orchestrator.run().await.unwrap();
    assert!(!fx.layout.venv_path().exists());
}

#[tokio::test]
async fn test_old_executable_is_gone_before_packaging() {
    let mut fx = fixture();
    fs::write(fx.layout.output_path(), "stale executable").unwrap();
    fs::write(fx.layout.root.join("pdf_toolkit.spec"), "stale descriptor").unwrap();

    fx.orchestrator.run().await.unwrap();

    let package = fx.runner.call_of(ToolKind::Package).unwrap();
    assert!(!package.output_existed);
    assert_ne!(fs::read(fx.layout.output_path()).unwrap(), b"stale executable");
    assert!(!fx.layout.root.join("pdf_toolkit.spec").exists());
}

#[tokio::test]
async fn test_app_bundle_is_part_of_the_output() {
    let mut fx = fixture_for(
        |mut layout| {
            layout.app_bundle = Some("pdf_toolkit.app".to_string());
            layout
        },
        |runner| runner,
    );
    let bundle = fx.layout.root.join("pdf_toolkit.app");
    fs::create_dir_all(bundle.join("Contents")).unwrap();
    fs::write(bundle.join("Contents").join("stale-marker"), "old").unwrap();
    let before = dir_entries(&fx.layout.root);

    fx.orchestrator.run().await.unwrap();

    let package = fx.runner.call_of(ToolKind::Package).unwrap();
    assert!(!package.output_existed, "stale bundle must be gone before packaging");
    assert!(!bundle.join("Contents").join("stale-marker").exists());
    assert!(bundle.join("Contents").join("MacOS").is_dir());

    let added: BTreeSet<_> = dir_entries(&fx.layout.root)
        .difference(&before)
        .cloned()
        .collect();
    assert_eq!(added, BTreeSet::from([fx.layout.output_name.clone()]));
}

#[tokio::test]
async fn test_old_executable_absent_after_failed_packaging() {
    let mut fx = fixture_with(|r| r.with_script(ToolKind::Package, Script::Fail(1)));
    fs::write(fx.layout.output_path(), "stale executable").unwrap();

    fx.orchestrator.run().await.unwrap_err();

    let package = fx.runner.call_of(ToolKind::Package).unwrap();
    assert!(!package.output_existed);
    assert!(!fx.layout.output_path().exists());
}

// ============================================================================
// Failure injection
// ============================================================================

async fn assert_halts_at(
    script: (ToolKind, Script),
    expected_calls: usize,
    expected_step: BuildStep,
) -> (Fixture, BuildError) {
    let (kind, script) = script;
    let mut fx = fixture_with(|r| r.with_script(kind, script));

    let err = fx.orchestrator.run().await.unwrap_err();

    assert_eq!(fx.runner.calls().len(), expected_calls);
    assert_eq!(
        fx.orchestrator.state_snapshot().outcome,
        Some(Outcome::Aborted(expected_step))
    );
    assert_eq!(err.failed_step(), expected_step);
    assert!(!fx.layout.output_path().exists());

    let console = fx.orchestrator.console().contents();
    assert!(!console.contains("BUILD SUCCESSFUL"));
    assert!(console.contains(err.label()));
    (fx, err)
}

#[tokio::test]
async fn test_missing_interpreter_halts_before_anything_is_created() {
    let (fx, err) = assert_halts_at(
        (ToolKind::Version, Script::NotFound),
        1,
        BuildStep::InterpreterDiscovery,
    )
    .await;

    assert!(matches!(err, BuildError::MissingInterpreter { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(!fx.layout.venv_path().exists());
    assert!(fx.orchestrator.console().contents().contains("Install Python 3"));
}

#[tokio::test]
async fn test_environment_creation_failure_halts() {
    let (_fx, err) = assert_halts_at(
        (ToolKind::Venv, Script::Fail(4)),
        2,
        BuildStep::EnvironmentIsolation,
    )
    .await;

    assert!(matches!(err, BuildError::EnvironmentCreation { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_environment_without_interpreter_fails_activation() {
    let (_fx, err) = assert_halts_at(
        (ToolKind::Venv, Script::SucceedWithoutArtifacts),
        2,
        BuildStep::EnvironmentActivation,
    )
    .await;

    assert!(matches!(err, BuildError::EnvironmentActivation { .. }));
}

#[tokio::test]
async fn test_scenario_b_installation_failure_keeps_environment() {
    let (fx, err) = assert_halts_at(
        (ToolKind::PipInstall, Script::Fail(1)),
        4,
        BuildStep::DependencyInstallation,
    )
    .await;

    assert!(matches!(err, BuildError::DependencyInstall { .. }));
    assert!(fx.layout.venv_path().is_dir(), "environment must be retained");

    let console = fx.orchestrator.console().contents();
    assert!(console.contains("Hint:"));
    assert!(console.contains(err.hint().unwrap()));
}

#[tokio::test]
async fn test_packaging_failure_retains_artifacts() {
    let (fx, err) = assert_halts_at(
        (ToolKind::Package, Script::Fail(1)),
        5,
        BuildStep::Packaging,
    )
    .await;

    assert!(matches!(err, BuildError::Packaging { .. }));
    assert!(fx.layout.venv_path().is_dir());
}

#[tokio::test]
async fn test_packaging_without_executable_is_a_failure() {
    let (_fx, err) = assert_halts_at(
        (ToolKind::Package, Script::SucceedWithoutArtifacts),
        5,
        BuildStep::Packaging,
    )
    .await;

    assert!(matches!(err, BuildError::Packaging { .. }));
}

#[tokio::test]
async fn test_old_interpreter_is_rejected() {
    let mut fx = fixture_with(|r| r.with_version_output("Python 2.7.18"));

    let err = fx.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, BuildError::MissingInterpreter { .. }));
    assert_eq!(err.failed_step(), BuildStep::InterpreterDiscovery);
    assert_eq!(fx.runner.kinds(), vec![ToolKind::Version]);
}

#[tokio::test]
async fn test_missing_source_halts_in_step_one() {
    let mut fx = fixture();
    fs::remove_file(fx.layout.source_path()).unwrap();

    let err = fx.orchestrator.run().await.unwrap_err();

    assert!(matches!(err, BuildError::MissingSource(_)));
    assert_eq!(
        fx.orchestrator.state_snapshot().outcome,
        Some(Outcome::Aborted(err.failed_step()))
    );
    assert_eq!(fx.runner.kinds(), vec![ToolKind::Version]);
    assert!(!fx.layout.venv_path().exists());
}

// ============================================================================
// Dry run
// ============================================================================

#[tokio::test]
async fn test_dry_run_executes_and_removes_nothing() {
    let mut fx = fixture();
    fs::create_dir_all(fx.layout.venv_path()).unwrap();
    fs::create_dir_all(fx.layout.scratch_path()).unwrap();
    fs::write(fx.layout.output_path(), "old").unwrap();
    let before = dir_entries(&fx.layout.root);

    let plan = fx.orchestrator.dry_run();

    assert!(fx.runner.calls().is_empty());
    assert_eq!(dir_entries(&fx.layout.root), before);
    assert!(fx.layout.output_path().exists());

    assert!(plan.len() >= 8);
    let console = fx.orchestrator.console().contents();
    assert!(console.contains("DRY RUN"));
    assert!(console.contains("--onefile"));
    assert!(console.contains("--hidden-import"));
}
