//! File Watcher Listener
//!
//! Accumulates watch reports from file sources and exports them on a fixed
//! period:
//! - Keeps the latest report per (pipeline, source) in a [`SnapshotStore`]
//! - Publishes per-file and per-source gauges to a [`MetricsSink`]
//! - Ships the raw window as one JSON record to a [`LogSink`]
//! - Starts a fresh window after every export

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{FileWatcherConfig, MetricsConfig};
use crate::error::{Error, Result};
use crate::eventbus::{Event, EventBus, Listener, Topic, WatchMetricData};
use crate::export::{render_log, LogSink, MetricsExporter, MetricsSink};
use crate::store::SnapshotStore;
use crate::types::WatchSnapshot;

use super::framework::{Service, ServiceError, ServiceStatus};

/// Outcome of one export cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// (pipeline, source) pairs exported
    pub snapshots: usize,

    /// Gauge samples rendered
    pub samples: usize,

    /// Size of the shipped log record (0 when the log export failed)
    pub log_bytes: usize,

    /// Metrics publication failure, if any
    pub metrics_error: Option<Error>,

    /// Log rendering or shipping failure, if any
    pub log_error: Option<Error>,
}

impl CycleReport {
    /// Check if both sinks accepted their output
    pub fn is_ok(&self) -> bool {
        self.metrics_error.is_none() && self.log_error.is_none()
    }
}

/// Event listener and export scheduler for [`Topic::FileWatcher`]
pub struct FileWatcherListener {
    /// Configuration
    config: FileWatcherConfig,

    /// Current export window
    store: Arc<SnapshotStore>,

    /// Gauge renderer
    exporter: MetricsExporter,

    /// Destination of rendered gauges
    metrics_sink: Arc<dyn MetricsSink>,

    /// Destination of the per-cycle record
    log_sink: Arc<dyn LogSink>,

    /// Current service status
    status: RwLock<ServiceStatus>,

    /// Completed export cycles
    cycle_count: AtomicU64,
}

impl FileWatcherListener {
    /// Create a listener with an empty store
    pub fn new(
        config: FileWatcherConfig,
        metrics_config: MetricsConfig,
        metrics_sink: Arc<dyn MetricsSink>,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        let exporter = MetricsExporter::new(metrics_config, config.unfinished_timeout);
        Self {
            config,
            store: Arc::new(SnapshotStore::new()),
            exporter,
            metrics_sink,
            log_sink,
            status: RwLock::new(ServiceStatus::Stopped),
            cycle_count: AtomicU64::new(0),
        }
    }

    /// Register this listener on `bus`
    pub fn register(self: &Arc<Self>, bus: &EventBus) {
        bus.register(self.clone());
    }

    /// Store backing the current window
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Number of export cycles completed
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.load(Ordering::Relaxed)
    }

    /// Record a watch report, replacing the previous one for its source
    pub fn on_watch(&self, data: WatchMetricData) {
        let snapshot = WatchSnapshot::from(data);
        tracing::trace!(
            pipeline = %snapshot.pipeline_name,
            source = %snapshot.source_name,
            files = snapshot.files.len(),
            "Watch report received"
        );
        self.store.upsert(snapshot);
    }

    /// Run one export cycle
    ///
    /// The window is taken and cleared under a single lock, so both sinks
    /// see the same content and a report arriving meanwhile lands in the
    /// next window. Failures are logged and reported but never retried.
    pub fn export_cycle(&self) -> CycleReport {
        let window = self.store.drain();
        let mut report = CycleReport {
            snapshots: window.len(),
            ..Default::default()
        };

        let samples = self.exporter.render(&window);
        report.samples = samples.len();
        if let Err(e) = self.metrics_sink.publish(Topic::FileWatcher, &samples) {
            tracing::error!(error = %e, "Failed to publish file watcher metrics");
            report.metrics_error = Some(e);
        }

        let shipped = render_log(&window).and_then(|payload| {
            self.log_sink.export(Topic::FileWatcher, &payload)?;
            Ok(payload.len())
        });
        match shipped {
            Ok(bytes) => report.log_bytes = bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to export file watcher log record");
                report.log_error = Some(e);
            }
        }

        self.cycle_count.fetch_add(1, Ordering::Relaxed);
        report
    }
}

impl Listener for FileWatcherListener {
    fn name(&self) -> &'static str {
        "filewatcher"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::FileWatcher]
    }

    fn subscribe(&self, event: Event) -> Result<()> {
        match event {
            Event::FileWatcher(data) => {
                self.on_watch(data);
                Ok(())
            }
            other => Err(Error::UnexpectedEvent {
                listener: Listener::name(self),
                topic: other.topic(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl Service for FileWatcherListener {
    async fn start(&self, mut shutdown: broadcast::Receiver<()>) -> std::result::Result<(), ServiceError> {
        if let Err(e) = self.config.validate() {
            *self.status.write() = ServiceStatus::Failed(e.to_string());
            return Err(ServiceError::StartFailed(e.to_string()));
        }

        *self.status.write() = ServiceStatus::Running;
        tracing::debug!(
            period_secs = self.config.period.as_secs(),
            unfinished_timeout_secs = self.config.unfinished_timeout.as_secs(),
            "File watcher listener started"
        );

        // First export happens one full period after start
        let period = self.config.period;
        let mut export_interval = interval_at(Instant::now() + period, period);
        export_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Shutdown signal received
                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => {
                            tracing::debug!("File watcher listener received shutdown signal");
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!(missed = n, "File watcher listener broadcast receiver lagged");
                        }
                    }
                }

                // Periodic export
                _ = export_interval.tick() => {
                    let report = self.export_cycle();
                    tracing::debug!(
                        snapshots = report.snapshots,
                        samples = report.samples,
                        log_bytes = report.log_bytes,
                        ok = report.is_ok(),
                        "File watcher export cycle completed"
                    );
                }
            }
        }

        *self.status.write() = ServiceStatus::Stopped;
        tracing::debug!("File watcher listener stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filewatcher"
    }

    fn status(&self) -> ServiceStatus {
        self.status.read().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
