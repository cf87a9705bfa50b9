//! Utility modules and helper functions

pub mod port_spec;

use std::time::Duration;

/// Logging utilities
pub struct Logger;

impl Logger {
    /// Initialize logger with specified level
    pub fn init(level: log::LevelFilter) {
        env_logger::Builder::from_default_env()
            .filter_level(level)
            .format_timestamp_secs()
            .init();
    }

    /// Log scan start
    pub fn log_scan_start(host: &str, ports: usize) {
        log::debug!("Starting scan of {} ({} ports)", host, ports);
    }

    /// Log scan completion
    pub fn log_scan_complete(duration: Duration, services: usize, total_ports: usize) {
        log::info!(
            "Scan completed in {:.2}s - {}/{} ports serving",
            duration.as_secs_f64(),
            services,
            total_ports
        );
    }
}
