use std::sync::Arc;

use app_builder::config::loader::{load_driver_config, resolve_config_path};
use app_builder::log_collector::get_global_logs_path;
use app_builder::orchestrator::{runner_from_env, BuildDriver};
use app_builder::LogCollector;

#[tokio::main]
async fn main() -> app_builder::Result<()> {
    // Configuration first: it decides the echo level of the logger.
    let config_path = resolve_config_path();
    let config = load_driver_config(config_path.as_deref())?;

    // =========================================================================
    // LOGGING INITIALIZATION
    // =========================================================================
    let log_dir = get_global_logs_path()?;
    let log_collector = Arc::new(LogCollector::new(log_dir, config.level_filter()?)?);
    if let Err(e) = log_collector.install() {
        eprintln!("[app_builder] WARNING: Failed to set LogCollector as global logger: {}", e);
    }
    log::info!(target: "parsed", "App Builder {} starting", app_builder::VERSION);
    match &config_path {
        Some(path) => log::info!("Loaded configuration from {}", path.display()),
        None => log::info!("No configuration file found, using defaults"),
    }
    log::debug!("Full log: {}", log_collector.full_log_path().display());

    // =========================================================================
    // BUILD
    // =========================================================================
    let runner = runner_from_env(Some(log_collector.clone()));
    let mut driver = BuildDriver::new(config, runner);
    let result = driver.run().await;

    // Per-unit failures are already in the report; only driver failures surface here.
    if let Ok(report) = &result {
        for outcome in report.outcomes.iter().filter(|o| !o.succeeded()) {
            log::debug!(
                "'{}' did not build: {}",
                outcome.unit.name,
                outcome.failure_reason().unwrap_or_default()
            );
        }
    }

    // =========================================================================
    // SHUTDOWN
    // =========================================================================
    if let Err(e) = log_collector.wait_for_empty().await {
        eprintln!("[app_builder] WARNING: Failed to flush logs: {}", e);
    }

    result.map(|_| ()).map_err(Into::into)
}
