//! Main scanning engine implementation

use crate::config::ScanConfig;
use crate::network::{FetchOutcome, LoopbackProber, MetadataFetcher, ProbeOutcome};
use crate::scanner::{create_batches, ScanSnapshot, Scanner, ServiceRecord};
use crate::utils::Logger;
use async_trait::async_trait;
use futures::future::join_all;
use std::time::Instant;

/// Scan engine: expands the configured ports, probes them in batches and
/// fetches metadata for whatever answered.
///
/// Every call to [`ScanEngine::run_scan`] is a full, independent scan; nothing
/// is cached between cycles.
pub struct ScanEngine {
    config: ScanConfig,
    prober: LoopbackProber,
    fetcher: MetadataFetcher,
}

impl ScanEngine {
    /// Create a new scan engine with the given configuration
    pub fn new(config: ScanConfig) -> crate::Result<Self> {
        config.validate()?;

        let prober = LoopbackProber::from_config(&config);
        let fetcher = MetadataFetcher::from_config(&config)?;

        Ok(Self {
            config,
            prober,
            fetcher,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Perform one full scan of the configured ports
    pub async fn run_scan(&self) -> ScanSnapshot {
        let start_time = Instant::now();
        let ports = self.config.target_ports();
        Logger::log_scan_start(&self.config.scan_host, ports.len());

        let snapshot = self.scan_ports(&ports).await;

        Logger::log_scan_complete(start_time.elapsed(), snapshot.len(), ports.len());
        snapshot
    }

    /// Scan an explicit, sorted port list
    pub async fn scan_ports(&self, ports: &[u16]) -> ScanSnapshot {
        let open_ports = self.reachable_ports(ports).await;

        let outcomes = join_all(open_ports.iter().map(|&port| self.fetcher.fetch(port))).await;

        let records = outcomes
            .into_iter()
            .map(|outcome| {
                self.log_fetch_failures(&outcome);
                ServiceRecord::new(outcome.port, outcome.metadata.title, outcome.metadata.favicon)
            })
            .collect();

        ScanSnapshot::new(records)
    }

    /// Probe ports batch by batch; returns the reachable ones in input order.
    ///
    /// Batches run one after another, ports within a batch concurrently, which
    /// bounds the number of sockets open at once.
    pub async fn reachable_ports(&self, ports: &[u16]) -> Vec<u16> {
        let candidates: Vec<u16> = ports
            .iter()
            .copied()
            .filter(|&port| Some(port) != self.config.self_port)
            .collect();

        let mut open_ports = Vec::new();

        for batch in create_batches(&candidates, self.config.batch_size) {
            let outcomes = join_all(batch.ports.iter().map(|&port| self.prober.probe(port))).await;

            for outcome in outcomes {
                self.log_probe_failures(&outcome);
                if outcome.reachable {
                    log::debug!("Port {} is reachable", outcome.port);
                    open_ports.push(outcome.port);
                }
            }
        }

        open_ports
    }

    fn log_probe_failures(&self, outcome: &ProbeOutcome) {
        for (host, failure) in outcome.unexpected_failures() {
            log::debug!("Probe of {}:{} {}", host, outcome.port, failure);
        }
    }

    fn log_fetch_failures(&self, outcome: &FetchOutcome) {
        for (host, failure) in outcome.failures.iter().filter(|(_, f)| !f.is_expected()) {
            log::debug!("Metadata request to {}:{} {}", host, outcome.port, failure);
        }
    }
}

#[async_trait]
impl Scanner for ScanEngine {
    async fn scan(&self) -> ScanSnapshot {
        self.run_scan().await
    }
}
