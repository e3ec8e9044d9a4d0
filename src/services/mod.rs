//! Background Services Module
//!
//! Provides the long-running export service and the small framework it runs
//! on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  publish  ┌──────────────────────┐  upsert  ┌───────────────┐
//! │  File Sources   │──────────▶│       EventBus       │─────────▶│ SnapshotStore │
//! └─────────────────┘           └──────────────────────┘          └───────┬───────┘
//!                                                                         │ drain
//!                               ┌──────────────────────┐   every period   │
//!                               │ FileWatcherListener  │◀─────────────────┘
//!                               └──────────┬───────────┘
//!                                 ┌────────┴────────┐
//!                                 ▼                 ▼
//!                          MetricsSink          LogSink
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use filewatch_exporter::services::{FileWatcherListener, ServiceHandle};
//!
//! let listener = Arc::new(FileWatcherListener::new(config, metrics, prom, log));
//! listener.register(&bus);
//! let handle = ServiceHandle::spawn(listener);
//!
//! // Graceful shutdown
//! handle.stop().await?;
//! ```

pub mod filewatcher;
pub mod framework;

pub use filewatcher::{CycleReport, FileWatcherListener};
pub use framework::{Service, ServiceError, ServiceHandle, ServiceStatus};
