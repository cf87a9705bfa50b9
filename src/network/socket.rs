//! TCP connect probing across the loopback address families

use crate::config::ScanConfig;
use crate::network::{AttemptOutcome, ProbeOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP connect prober for one or more candidate hosts.
///
/// A port is reachable when any host accepts a connection. Attempts against
/// all hosts run concurrently; the first accepted connection settles the probe
/// and the remaining attempts are dropped, which closes their sockets.
#[derive(Debug, Clone)]
pub struct LoopbackProber {
    hosts: Vec<String>,
    timeout: Duration,
}

impl LoopbackProber {
    pub fn new(hosts: Vec<String>, timeout: Duration) -> Self {
        Self { hosts, timeout }
    }

    /// Prober for the hosts and timeout of a scan configuration
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.probe_hosts(), config.probe_timeout_duration())
    }

    /// Single connect attempt, bounded by the probe timeout
    pub async fn connect_once(&self, host: &str, port: u16) -> AttemptOutcome {
        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => {
                // Only reachability matters; close right away
                drop(stream);
                AttemptOutcome::Connected
            }
            Ok(Err(e)) => AttemptOutcome::from_io_error(&e),
            Err(_) => AttemptOutcome::TimedOut,
        }
    }

    /// Probe a port on every candidate host, first success wins
    pub async fn probe(&self, port: u16) -> ProbeOutcome {
        let attempts = self
            .hosts
            .iter()
            .map(|host| async move { (host.clone(), self.connect_once(host, port).await) });

        first_success(port, attempts).await
    }
}

/// Race attempts against each other and settle on the first success.
///
/// Attempts still pending at that point are dropped along with the set.
pub async fn first_success<I, F>(port: u16, attempts: I) -> ProbeOutcome
where
    I: IntoIterator<Item = F>,
    F: Future<Output = (String, AttemptOutcome)>,
{
    let mut pending: FuturesUnordered<F> = attempts.into_iter().collect();

    let mut failures = Vec::with_capacity(pending.len());
    while let Some((host, outcome)) = pending.next().await {
        if outcome.is_success() {
            return ProbeOutcome::reachable(port);
        }
        failures.push((host, outcome));
    }

    ProbeOutcome::unreachable(port, failures)
}
