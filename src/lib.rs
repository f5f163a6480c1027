// Public modules
pub mod bus;
pub mod config;
pub mod devm;
pub mod errors;
pub mod iio;
pub mod messages;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use config::{load_bus_config, load_device_config, ProbePolicy};
pub use errors::{DriverError, DriverResult};
pub use registry::{init_all, Hub};
pub use scheduler::spawn_sensor_tasks;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    // RUST_LOG=debug prints every polled sample as JSON
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();
}

/// `RUST_LOG` directives when set and valid, INFO otherwise
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Bring up every configured bus and device from `config_path`, poll until
/// Ctrl-C, then detach everything.
pub async fn run(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("[dmard09d] starting up...");

    let bus_cfg = load_bus_config(&format!("{}/buses.toml", config_path))?;
    let device_cfg = load_device_config(&format!("{}/devices.toml", config_path))?;
    info!(
        "[config] loaded {} bus(es), {} device(s), policy {:?}",
        bus_cfg.buses.len(),
        device_cfg.devices.len(),
        device_cfg.policy
    );

    let hub = init_all(&bus_cfg, &device_cfg).await?;
    info!("[registry] buses and devices initialized");

    let tasks = spawn_sensor_tasks(hub.iio.clone(), &hub.devices);
    info!("[main] {} sensor task(s) launched", tasks.len());

    tokio::signal::ctrl_c().await?;
    info!("[main] interrupted, shutting down");

    hub.shutdown().await;
    for task in tasks {
        // Tasks stop on their own once their device is unregistered
        if let Err(e) = task.await {
            tracing::warn!("[main] sensor task ended abnormally: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(log_filter(Some("dmard09=trace")).to_string(), "dmard09=trace");
    }
}
