//! Gauge rendering and per-file status classification

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::MetricsConfig;
use crate::store::StoreSnapshot;
use crate::types::{FileRecord, FileStatus, WatchSnapshot};

use super::MetricSample;

/// Label carrying the pipeline name
pub const PIPELINE_LABEL: &str = "pipeline";
/// Label carrying the source name
pub const SOURCE_LABEL: &str = "source";
/// Label carrying the file path
pub const FILE_NAME_LABEL: &str = "filename";
/// Label carrying the derived [`FileStatus`]
pub const STATUS_LABEL: &str = "status";

/// Derive the status of a file at `now`
///
/// Ignored wins over staleness so files skipped on purpose are never
/// reported as stuck. A file is unfinished when it has been quiet for longer
/// than `unfinished_timeout` and still has at least one unacknowledged byte.
pub fn classify(
    file: &FileRecord,
    unfinished_timeout: Duration,
    now: DateTime<Utc>,
) -> FileStatus {
    if file.ignore_older {
        return FileStatus::Ignored;
    }

    let idle = now.signed_duration_since(file.last_modify_time);
    // A timeout beyond chrono's range can never be exceeded
    let stale = chrono::Duration::from_std(unfinished_timeout)
        .map(|timeout| idle > timeout)
        .unwrap_or(false);

    if stale && file.file_size.abs_diff(file.ack_offset) >= 1 {
        FileStatus::Unfinished
    } else {
        FileStatus::Pending
    }
}

/// Renders an export window into flat gauge samples
///
/// Each snapshot yields two samples and each of its files three, with no
/// aggregation across files or pipelines.
#[derive(Debug, Clone)]
pub struct MetricsExporter {
    config: MetricsConfig,
    unfinished_timeout: Duration,
}

impl MetricsExporter {
    /// Create a new exporter
    pub fn new(config: MetricsConfig, unfinished_timeout: Duration) -> Self {
        Self {
            config,
            unfinished_timeout,
        }
    }

    /// Render the window using the current time for classification
    pub fn render(&self, window: &StoreSnapshot) -> Vec<MetricSample> {
        self.render_at(window, Utc::now())
    }

    /// Render the window, classifying files against `now`
    pub fn render_at(&self, window: &StoreSnapshot, now: DateTime<Utc>) -> Vec<MetricSample> {
        let file_count: usize = window.values().map(|s| s.files.len()).sum();
        let mut samples = Vec::with_capacity(2 * window.len() + 3 * file_count);

        for snapshot in window.values() {
            self.render_snapshot(snapshot, now, &mut samples);
        }

        samples
    }

    fn render_snapshot(
        &self,
        snapshot: &WatchSnapshot,
        now: DateTime<Utc>,
        out: &mut Vec<MetricSample>,
    ) {
        let pipeline = snapshot.pipeline_name.as_str();
        let source = snapshot.source_name.as_str();

        out.push(
            MetricSample::new(
                self.config.fq_name("total_file_count"),
                "file count total",
                snapshot.total_file_count as f64,
            )
            .with_label(PIPELINE_LABEL, pipeline)
            .with_label(SOURCE_LABEL, source),
        );
        out.push(
            MetricSample::new(
                self.config.fq_name("inactive_file_count"),
                "inactive file count",
                snapshot.inactive_fd_count as f64,
            )
            .with_label(PIPELINE_LABEL, pipeline)
            .with_label(SOURCE_LABEL, source),
        );

        for file in &snapshot.files {
            let status = classify(file, self.unfinished_timeout, now);
            let file_sample = |name: &str, help: &str, value: f64| {
                MetricSample::new(self.config.fq_name(name), help, value)
                    .with_label(PIPELINE_LABEL, pipeline)
                    .with_label(SOURCE_LABEL, source)
                    .with_label(FILE_NAME_LABEL, file.file_name.as_str())
                    .with_label(STATUS_LABEL, status.as_str())
            };

            out.push(file_sample("file_size", "file size", file.file_size as f64));
            out.push(file_sample(
                "file_ack_offset",
                "file ack offset",
                file.ack_offset as f64,
            ));
            out.push(file_sample(
                "file_last_modify",
                "file last modify timestamp",
                file.last_modify_time.timestamp_millis() as f64,
            ));
        }
    }
}
