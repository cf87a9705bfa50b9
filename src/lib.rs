//! devscope - see what is running on localhost
//!
//! Probes a configured set of local ports, reads the title and favicon of every
//! service that answers over HTTP, and keeps connected dashboards up to date.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use broadcast::{Broadcaster, ChannelObserver, Observer, ObserverId};
pub use config::{ScanConfig, ServerConfig};
pub use error::ScanError;
pub use scanner::{ScanEngine, ScanSnapshot, Scanner, ServiceRecord};
pub use utils::port_spec::{expand_ports, PortSpec};

pub type Result<T> = std::result::Result<T, ScanError>;
