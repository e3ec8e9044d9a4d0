//! File watcher metrics exporter
//!
//! Collects the watch reports that file-tailing sources publish on the
//! event bus and, once per period, exports the latest report of every
//! (pipeline, source) pair twice: as labelled gauges for a Prometheus
//! scrape, and as one structured JSON log record. Each export starts a
//! fresh accumulation window.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use filewatch_exporter::{
//!     ExporterConfig, EventBus, FileWatcherListener, PrometheusSink, ServiceHandle, TracingLogSink,
//! };
//!
//! let config = ExporterConfig::load_from_file("exporter.toml")?;
//! filewatch_exporter::init_logging(&config.logging)?;
//!
//! let prometheus = Arc::new(PrometheusSink::new());
//! let listener = Arc::new(FileWatcherListener::new(
//!     config.filewatcher.clone(),
//!     config.metrics.clone(),
//!     prometheus.clone(),
//!     Arc::new(TracingLogSink),
//! ));
//!
//! let bus = EventBus::new();
//! listener.register(&bus);
//! let handle = ServiceHandle::spawn(listener);
//! ```

pub mod config;
pub mod error;
pub mod eventbus;
pub mod export;
pub mod logging;
pub mod services;
pub mod store;
pub mod types;

pub use config::{ExporterConfig, FileWatcherConfig, MetricsConfig};
pub use error::{Error, Result};
pub use eventbus::{Event, EventBus, FileInfo, Listener, Topic, WatchMetricData};
pub use export::{
    classify, render_log, LogSink, MetricSample, MetricsExporter, MetricsSink,
    PrometheusSink, TracingLogSink,
};
pub use logging::{init_logging, LogConfig};
pub use services::{CycleReport, FileWatcherListener, Service, ServiceHandle, ServiceStatus};
pub use store::{SnapshotStore, StoreSnapshot};
pub use types::{FileRecord, FileStatus, SnapshotKey, WatchSnapshot};
