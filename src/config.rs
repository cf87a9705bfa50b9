//! Configuration module for devscope

use crate::utils::port_spec::{expand_ports, PortSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loopback address that also enables the IPv6 loopback as a fallback
pub const IPV4_LOOPBACK: &str = "127.0.0.1";

/// Hostname that is only resolvable from inside a container runtime
pub const DEFAULT_CONTAINER_ALIAS: &str = "host.docker.internal";

/// Scan configuration, passed explicitly to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Ports to watch, as single ports or `"start-end"` ranges
    pub ports: Vec<PortSpec>,

    /// Host the probes and HTTP requests go to
    pub scan_host: String,

    /// Container-internal hostname rewritten to `localhost` in favicon URLs
    pub container_host_alias: String,

    /// Our own listening port, never probed
    pub self_port: Option<u16>,

    /// Timeout for each TCP connect attempt in milliseconds
    pub probe_timeout: u64,

    /// Timeout for each HTTP metadata request in milliseconds
    pub fetch_timeout: u64,

    /// Number of ports probed concurrently per batch
    pub batch_size: usize,

    /// Interval between broadcast scans in milliseconds
    pub scan_interval: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ports: vec![
                PortSpec::Range("3000-3010".to_string()),
                PortSpec::Single(4200),
                PortSpec::Range("5173-5176".to_string()), // Vite
                PortSpec::Single(8000),
                PortSpec::Range("8080-8090".to_string()),
                PortSpec::Single(1313), // Hugo
            ],
            scan_host: IPV4_LOOPBACK.to_string(),
            container_host_alias: DEFAULT_CONTAINER_ALIAS.to_string(),
            self_port: Some(3000),
            probe_timeout: 200,
            fetch_timeout: 1500,
            batch_size: 50,
            scan_interval: 3000,
        }
    }
}

impl ScanConfig {
    /// Create a configuration watching the given ports, defaults elsewhere
    pub fn new(ports: Vec<PortSpec>) -> Self {
        Self {
            ports,
            ..Default::default()
        }
    }

    /// Set the scan host
    pub fn with_scan_host(mut self, scan_host: impl Into<String>) -> Self {
        self.scan_host = scan_host.into();
        self
    }

    /// Set (or clear) the port excluded as our own
    pub fn with_self_port(mut self, self_port: Option<u16>) -> Self {
        self.self_port = self_port;
        self
    }

    /// Set the probe timeout in milliseconds
    pub fn with_probe_timeout(mut self, timeout: u64) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the metadata fetch timeout in milliseconds
    pub fn with_fetch_timeout(mut self, timeout: u64) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the probe batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the broadcast interval in milliseconds
    pub fn with_scan_interval(mut self, interval: u64) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn probe_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.probe_timeout)
    }

    pub fn fetch_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }

    pub fn scan_interval_duration(&self) -> Duration {
        Duration::from_millis(self.scan_interval)
    }

    /// The configured ports, expanded, deduplicated and sorted
    pub fn target_ports(&self) -> Vec<u16> {
        expand_ports(&self.ports)
    }

    /// Whether the IPv6 loopback should be tried alongside `scan_host`.
    ///
    /// Only a plain IPv4 loopback scan is dual stack; a container host alias
    /// is used on its own.
    pub fn is_dual_stack(&self) -> bool {
        self.scan_host == IPV4_LOOPBACK
    }

    /// Hosts for TCP probes, in priority order
    pub fn probe_hosts(&self) -> Vec<String> {
        let mut hosts = vec![self.scan_host.clone()];
        if self.is_dual_stack() {
            hosts.push("::1".to_string());
        }
        hosts
    }

    /// Hosts for HTTP requests, in priority order (IPv6 literals bracketed)
    pub fn http_hosts(&self) -> Vec<String> {
        let mut hosts = vec![self.scan_host.clone()];
        if self.is_dual_stack() {
            hosts.push("[::1]".to_string());
        }
        hosts
    }

    /// Load configuration from a TOML file with a `[scan]` table
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Ok(ConfigFile::from_toml_file(path)?.scan)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.scan_host.trim().is_empty() {
            return Err(crate::ScanError::ConfigError("Scan host cannot be empty".to_string()));
        }

        if self.target_ports().is_empty() {
            return Err(crate::ScanError::ConfigError("No valid ports specified".to_string()));
        }

        if self.batch_size == 0 {
            return Err(crate::ScanError::ConfigError("Batch size must be greater than 0".to_string()));
        }

        if self.probe_timeout == 0 || self.fetch_timeout == 0 {
            return Err(crate::ScanError::ConfigError("Timeouts must be greater than 0".to_string()));
        }

        if self.scan_interval == 0 {
            return Err(crate::ScanError::ConfigError("Scan interval must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// HTTP/WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000")
    pub bind_address: String,
    /// Path of the WebSocket push endpoint
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            ws_path: "/ws".to_string(),
        }
    }
}

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub scan: ScanConfig,
    pub server: ServerConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::ScanError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from `~/.devscope.toml`, falling back to defaults
    pub fn load_default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".devscope.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }
}
