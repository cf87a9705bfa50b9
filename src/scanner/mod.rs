//! Scanner module: service records, snapshots and the scanning engine

pub mod engine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use engine::ScanEngine;

/// One discovered service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub port: u16,
    /// Always `http://localhost:<port>`, whichever host answered
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
}

impl ServiceRecord {
    pub fn new(port: u16, title: String, favicon: Option<String>) -> Self {
        Self {
            port,
            url: format!("http://localhost:{}", port),
            title,
            favicon,
        }
    }
}

/// Complete result of one scan cycle, ordered by port.
///
/// Serializes as a bare JSON array of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanSnapshot {
    records: Vec<ServiceRecord>,
}

impl ScanSnapshot {
    /// Build a snapshot; records are sorted by port
    pub fn new(mut records: Vec<ServiceRecord>) -> Self {
        records.sort_by_key(|record| record.port);
        Self { records }
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn ports(&self) -> Vec<u16> {
        self.records.iter().map(|record| record.port).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Wire payload pushed to observers
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Anything that can produce a fresh snapshot on demand
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self) -> ScanSnapshot;
}

/// A chunk of ports probed together
#[derive(Debug, Clone)]
pub struct ScanBatch {
    pub ports: Vec<u16>,
    pub batch_id: usize,
}

impl ScanBatch {
    pub fn new(ports: Vec<u16>, batch_id: usize) -> Self {
        Self { ports, batch_id }
    }

    pub fn size(&self) -> usize {
        self.ports.len()
    }
}

/// Split a port list into consecutive batches, preserving order
pub fn create_batches(ports: &[u16], batch_size: usize) -> Vec<ScanBatch> {
    ports
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(id, chunk)| ScanBatch::new(chunk.to_vec(), id))
        .collect()
}
