use std::sync::Arc;

use anyhow::Context;

use pdf_toolkit_builder::config::pause_without_settings;
use pdf_toolkit_builder::system::{pause_for_acknowledgment, Console};
use pdf_toolkit_builder::{
    BuildLayout, BuildOrchestrator, LogCollector, ProcessRunner, SettingsManager,
};

#[tokio::main]
async fn main() -> pdf_toolkit_builder::Result<()> {
    let root = std::env::current_dir().context("Failed to determine the invocation directory")?;
    let console = Console::terminal();

    // =========================================================================
    // SETTINGS
    // =========================================================================
    let settings = match SettingsManager::load(&root) {
        Ok(settings) => settings,
        Err(e) => {
            console.error("CONFIGURATION ERROR", &e.to_string(), None);
            if pause_without_settings(|key| std::env::var(key).ok()) {
                if let Err(e) = pause_for_acknowledgment() {
                    eprintln!("[Main] WARNING: Pause failed: {}", e);
                }
            }
            std::process::exit(1);
        }
    };

    // =========================================================================
    // SESSION LOG
    // =========================================================================
    let log_collector = match settings.resolved_log_dir() {
        Some(dir) => match LogCollector::new(&dir) {
            Ok(collector) => Some(collector),
            Err(e) => {
                eprintln!("[Main] WARNING: Session log disabled: {}", e);
                None
            }
        },
        None => {
            eprintln!("[Main] WARNING: No data directory available, session log disabled");
            None
        }
    };

    if let Some(ref collector) = log_collector {
        let max_level = log::LevelFilter::Info;
        if let Err(e) = log::set_boxed_logger(Box::new(collector.clone()))
            .map(|()| log::set_max_level(max_level))
        {
            eprintln!("[Main] WARNING: Failed to set LogCollector as global logger: {}", e);
        }
        log::info!(
            "PDF Toolkit Builder {} logging to {}",
            pdf_toolkit_builder::VERSION,
            collector.session_path().display()
        );
    }

    // =========================================================================
    // BUILD
    // =========================================================================
    let runner = Arc::new(ProcessRunner::new(settings.echo_tool_output));
    let mut orchestrator =
        BuildOrchestrator::new(BuildLayout::new(&root), settings.clone(), runner)
            .with_console(console);

    let exit_code = if settings.dry_run {
        orchestrator.dry_run();
        0
    } else {
        match orchestrator.run().await {
            Ok(_) => 0,
            Err(err) => {
                if let Some(ref collector) = log_collector {
                    eprintln!("Build log: {}", collector.session_path().display());
                }
                if settings.pause_on_failure {
                    if let Err(e) = pause_for_acknowledgment() {
                        log::warn!("[Main] Pause failed: {}", e);
                    }
                }
                err.exit_code()
            }
        }
    };

    // =========================================================================
    // SHUTDOWN
    // =========================================================================
    if let Some(ref collector) = log_collector {
        log::info!("Exiting with code {}", exit_code);
        if let Err(e) = collector.wait_for_empty().await {
            eprintln!("[Main] WARNING: Failed to flush session log: {}", e);
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
