//! Record sinks
//!
//! The collector hands every [`MetricRecord`] to an [`Accumulator`]. The HTTP
//! server and the `--once` mode both use [`MemoryAccumulator`].

use std::sync::Mutex;

use crate::transformer::MetricRecord;

/// Destination for records produced by a collection cycle
pub trait Accumulator: Send + Sync {
    /// Accept one record
    fn add_record(&self, record: MetricRecord);
}

/// Accumulator that keeps records in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemoryAccumulator {
    records: Mutex<Vec<MetricRecord>>,
}

impl MemoryAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records received so far
    pub fn records(&self) -> Vec<MetricRecord> {
        self.lock().clone()
    }

    /// Take all records, leaving the accumulator empty
    pub fn take(&self) -> Vec<MetricRecord> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of records received
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no record has been received
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// First record with the given measurement and exactly the given tags
    pub fn find(&self, measurement: &str, tags: &[(&str, &str)]) -> Option<MetricRecord> {
        self.lock()
            .iter()
            .find(|r| r.measurement == measurement && r.has_tags(tags))
            .cloned()
    }

    /// True when any record has the given measurement
    pub fn has_measurement(&self, measurement: &str) -> bool {
        self.lock().iter().any(|r| r.measurement == measurement)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MetricRecord>> {
        // records are plain data; a poisoned lock still holds a usable Vec
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Accumulator for MemoryAccumulator {
    fn add_record(&self, record: MetricRecord) {
        self.lock().push(record);
    }
}
