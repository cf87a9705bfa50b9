//! Port configuration entries and their expansion into a concrete port list

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single configured port entry: either a port number or an inclusive
/// `"start-end"` range.
///
/// Deserializes from either an integer or a string, so a TOML list such as
/// `ports = ["3000-3010", 4200]` maps directly onto `Vec<PortSpec>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// A single port. Kept wide so out-of-range values can be skipped instead
    /// of rejecting the whole configuration.
    Single(i64),
    /// A `"start-end"` range, or a numeric string
    Range(String),
}

impl PortSpec {
    /// Parse a comma separated list (e.g. `"3000-3010,4200"`) into entries.
    /// Empty segments are ignored; nothing is validated until expansion.
    pub fn parse_list(list: &str) -> Vec<PortSpec> {
        list.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(PortSpec::from)
            .collect()
    }

    /// Insert every port this entry describes into `ports`.
    /// Malformed entries contribute nothing.
    fn expand_into(&self, ports: &mut BTreeSet<u16>) {
        match self {
            PortSpec::Single(port) => {
                if let Ok(port) = u16::try_from(*port) {
                    ports.insert(port);
                }
            }
            PortSpec::Range(text) => match text.split_once('-') {
                Some((start, end)) => {
                    let (Ok(start), Ok(end)) = (start.trim().parse::<u16>(), end.trim().parse::<u16>()) else {
                        return;
                    };
                    // start > end yields an empty range
                    ports.extend(start..=end);
                }
                None => {
                    if let Ok(port) = text.trim().parse::<u16>() {
                        ports.insert(port);
                    }
                }
            },
        }
    }
}

impl From<&str> for PortSpec {
    fn from(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(port) => PortSpec::Single(port),
            Err(_) => PortSpec::Range(text.trim().to_string()),
        }
    }
}

impl From<u16> for PortSpec {
    fn from(port: u16) -> Self {
        PortSpec::Single(port as i64)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Single(port) => write!(f, "{}", port),
            PortSpec::Range(text) => write!(f, "{}", text),
        }
    }
}

/// Expand configured entries into the distinct ports they describe, ascending.
///
/// The result depends only on the set of entries, never on their order, which
/// keeps scan output deterministic across cycles.
pub fn expand_ports(specs: &[PortSpec]) -> Vec<u16> {
    let mut ports = BTreeSet::new();
    for spec in specs {
        spec.expand_into(&mut ports);
    }
    ports.into_iter().collect()
}
