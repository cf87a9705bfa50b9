//! Network module: loopback reachability probes and HTTP metadata requests

pub mod http;
pub mod socket;

use std::fmt;
use std::io;

pub use http::{FetchOutcome, MetadataFetcher, ServiceMetadata};
pub use socket::LoopbackProber;

/// Result of a single connect or request attempt against one host.
///
/// Refusals and timeouts are the normal answer from a port nobody listens on,
/// so they are kept apart from failures worth a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The host accepted the connection (or answered the request)
    Connected,
    /// Nothing is listening
    Refused,
    /// The attempt did not finish within its timeout
    TimedOut,
    /// Anything else: address family unavailable, malformed response, ...
    Failed(String),
}

impl AttemptOutcome {
    /// Classify a connect error
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset => AttemptOutcome::Refused,
            io::ErrorKind::TimedOut => AttemptOutcome::TimedOut,
            _ => AttemptOutcome::Failed(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Connected)
    }

    /// Whether this outcome is routine for a closed or single-stack port
    pub fn is_expected(&self) -> bool {
        !matches!(self, AttemptOutcome::Failed(_))
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Connected => write!(f, "connected"),
            AttemptOutcome::Refused => write!(f, "refused"),
            AttemptOutcome::TimedOut => write!(f, "timed out"),
            AttemptOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Reachability of one port across all candidate hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub port: u16,
    pub reachable: bool,
    /// Per-host outcomes of a failed probe, `(host, outcome)`.
    /// Empty when the probe succeeded; losing attempts are discarded.
    pub attempts: Vec<(String, AttemptOutcome)>,
}

impl ProbeOutcome {
    pub fn reachable(port: u16) -> Self {
        Self {
            port,
            reachable: true,
            attempts: Vec::new(),
        }
    }

    pub fn unreachable(port: u16, attempts: Vec<(String, AttemptOutcome)>) -> Self {
        Self {
            port,
            reachable: false,
            attempts,
        }
    }

    /// Attempts that failed for a reason other than refusal or timeout
    pub fn unexpected_failures(&self) -> impl Iterator<Item = &(String, AttemptOutcome)> {
        self.attempts.iter().filter(|(_, outcome)| !outcome.is_expected())
    }
}
