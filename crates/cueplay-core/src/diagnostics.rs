//! Debug diagnostics
//!
//! The player reports what it is doing (backend selection, recovery, dropped
//! seeks, stale signals) to a [`DiagnosticSink`] when `debug` is enabled.
//! The default sink forwards to `tracing`; [`MemorySink`] keeps records so
//! tests and tools can inspect them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// One diagnostic line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// Per-player sequence number, starting at 0
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Destination for diagnostic records
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: DiagnosticRecord);
}

/// Forwards records to `tracing` at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, record: DiagnosticRecord) {
        tracing::debug!(sequence = record.sequence, "{}", record.message);
    }
}

/// Keeps every record in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    /// Check if any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(needle))
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, record: DiagnosticRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

/// Gate in front of a sink
pub(crate) struct Diagnostics {
    enabled: bool,
    sink: Arc<dyn DiagnosticSink>,
    sequence: u64,
}

impl Diagnostics {
    pub(crate) fn new(enabled: bool, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            enabled,
            sink,
            sequence: 0,
        }
    }

    pub(crate) fn log(&mut self, message: impl FnOnce() -> String) {
        if !self.enabled {
            return;
        }
        self.sink.record(DiagnosticRecord {
            sequence: self.sequence,
            timestamp: Utc::now(),
            message: message(),
        });
        self.sequence += 1;
    }
}
