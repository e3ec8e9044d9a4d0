//! Export layer
//!
//! Renders an export window into the two representations shipped each
//! cycle and defines the sinks that receive them.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────┐
//!                    │   StoreSnapshot  │
//!                    └────────┬─────────┘
//!               ┌─────────────┴─────────────┐
//!     ┌─────────▼─────────┐       ┌─────────▼─────────┐
//!     │  MetricsExporter  │       │    render_log     │
//!     │ (gauge samples)   │       │  (JSON record)    │
//!     └─────────┬─────────┘       └─────────┬─────────┘
//!     ┌─────────▼─────────┐       ┌─────────▼─────────┐
//!     │   MetricsSink     │       │     LogSink       │
//!     │ PrometheusSink    │       │  TracingLogSink   │
//!     └───────────────────┘       └───────────────────┘
//! ```

use std::collections::BTreeMap;

use crate::error::Result;
use crate::eventbus::Topic;

pub mod logger;
pub mod metrics;
pub mod prometheus_exporter;

pub use logger::{render_log, TracingLogSink};
pub use metrics::{classify, MetricsExporter};
pub use prometheus_exporter::{PrometheusSink, TEXT_CONTENT_TYPE};

/// A single labelled gauge value
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Fully-qualified metric name
    pub name: String,

    /// Help text
    pub help: String,

    /// Gauge value
    pub value: f64,

    /// Label pairs, sorted by name
    pub labels: BTreeMap<String, String>,
}

impl MetricSample {
    /// Create a new sample without labels
    pub fn new(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value,
            labels: BTreeMap::new(),
        }
    }

    /// Add a label to the sample
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Value of a label, if present
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Receiver of rendered gauge samples
pub trait MetricsSink: Send + Sync {
    /// Replace the samples exposed for `topic` with `samples`
    fn publish(&self, topic: Topic, samples: &[MetricSample]) -> Result<()>;
}

/// Receiver of the serialized per-cycle record
pub trait LogSink: Send + Sync {
    /// Ship one record for `topic`
    fn export(&self, topic: Topic, payload: &[u8]) -> Result<()>;
}

/// Keeps everything it receives, for inspection in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemorySink {
    metrics: parking_lot::Mutex<Vec<Vec<MetricSample>>>,
    records: parking_lot::Mutex<Vec<Vec<u8>>>,
}

#[cfg(test)]
impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sample batch published so far, oldest first
    pub fn metric_batches(&self) -> Vec<Vec<MetricSample>> {
        self.metrics.lock().clone()
    }

    /// Every log record exported so far, oldest first
    pub fn log_records(&self) -> Vec<Vec<u8>> {
        self.records.lock().clone()
    }

    /// Most recent sample batch
    pub fn last_metrics(&self) -> Option<Vec<MetricSample>> {
        self.metrics.lock().last().cloned()
    }

    /// Most recent log record
    pub fn last_record(&self) -> Option<Vec<u8>> {
        self.records.lock().last().cloned()
    }
}

#[cfg(test)]
impl MetricsSink for MemorySink {
    fn publish(&self, _topic: Topic, samples: &[MetricSample]) -> Result<()> {
        self.metrics.lock().push(samples.to_vec());
        Ok(())
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn export(&self, _topic: Topic, payload: &[u8]) -> Result<()> {
        self.records.lock().push(payload.to_vec());
        Ok(())
    }
}
