//! Durable, append-only record of every accepted reading.

use std::time::SystemTime;

use crate::{payload::SensorReading, relay::RelayState, Result};

mod jsonl;

pub use jsonl::{read_recent, JsonlStore, DEFAULT_STORE_PATH};

/// One reading plus the relay state derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistedRecord {
    pub timestamp: SystemTime,
    pub temperature: f64,
    pub humidity: f64,
    pub relay: RelayState,
}

impl PersistedRecord {
    pub fn from_reading(reading: &SensorReading, relay: RelayState) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
            relay,
        }
    }
}

/// A committed record with its store-assigned id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredRecord {
    pub id: u64,
    pub record: PersistedRecord,
}

/// Persistence contract used by the control loop.
///
/// Ids are assigned by the store and strictly increase in append order.
/// Failures are reported as `Error::Storage` and never retried here.
pub trait RecordStore {
    /// Commit `record` and return its id.
    fn append(&mut self, record: &PersistedRecord) -> Result<u64>;

    /// Up to `limit` most recent records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Non-durable store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<StoredRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far, oldest first.
    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }
}

impl RecordStore for MemoryStore {
    fn append(&mut self, record: &PersistedRecord) -> Result<u64> {
        let id = self.records.last().map_or(1, |last| last.id + 1);
        self.records.push(StoredRecord {
            id,
            record: *record,
        });
        Ok(id)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        Ok(self.records.iter().rev().take(limit).copied().collect())
    }
}
