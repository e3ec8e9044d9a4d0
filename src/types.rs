//! Core data types used throughout the exporter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::eventbus::{FileInfo, WatchMetricData};

/// Identity of a watch snapshot: one per (pipeline, source) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey {
    /// Pipeline name
    pub pipeline: String,
    /// Source name within the pipeline
    pub source: String,
}

impl SnapshotKey {
    /// Create a new key
    pub fn new(pipeline: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            source: source.into(),
        }
    }
}

/// Escapes `\` and `-` so the flattened `pipeline-source` form stays unambiguous
fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '-' => f.write_str("\\-")?,
            _ => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.pipeline)?;
        f.write_str("-")?;
        write_escaped(f, &self.source)
    }
}

/// State of one tracked file within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File path as reported by the source
    #[serde(rename = "name")]
    pub file_name: String,

    /// File size in bytes. Not carried in the log record: consumers stat
    /// the file themselves.
    #[serde(skip_serializing, default)]
    pub file_size: i64,

    /// Last acknowledged read position in bytes
    #[serde(rename = "ackOffset")]
    pub ack_offset: i64,

    /// Last modification time of the file
    #[serde(rename = "modify")]
    pub last_modify_time: DateTime<Utc>,

    /// File was excluded from active processing by the age policy
    #[serde(rename = "ignoreOlder")]
    pub ignore_older: bool,
}

impl From<FileInfo> for FileRecord {
    fn from(info: FileInfo) -> Self {
        Self {
            file_name: info.file_name,
            file_size: info.size,
            ack_offset: info.offset,
            last_modify_time: info.last_modify_time,
            ignore_older: info.is_ignore_older,
        }
    }
}

/// Latest watch report for one (pipeline, source) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchSnapshot {
    /// Pipeline name
    #[serde(rename = "pipeline")]
    pub pipeline_name: String,

    /// Source name
    #[serde(rename = "source")]
    pub source_name: String,

    /// Tracked files, in the order the source reported them
    #[serde(rename = "info", default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileRecord>,

    /// Total number of files matched by the source
    #[serde(rename = "total")]
    pub total_file_count: u64,

    /// Number of file descriptors considered inactive
    #[serde(rename = "inactive")]
    pub inactive_fd_count: u64,
}

impl WatchSnapshot {
    /// Key under which this snapshot is stored
    pub fn key(&self) -> SnapshotKey {
        SnapshotKey::new(&self.pipeline_name, &self.source_name)
    }
}

impl From<WatchMetricData> for WatchSnapshot {
    fn from(data: WatchMetricData) -> Self {
        Self {
            pipeline_name: data.pipeline_name,
            source_name: data.source_name,
            files: data.file_infos.into_iter().map(FileRecord::from).collect(),
            total_file_count: data.total_file_count,
            inactive_fd_count: data.inactive_fd_count,
        }
    }
}

/// Health status derived for a single file at export time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// File is within its normal processing window
    Pending,
    /// File went quiet while still holding unacknowledged bytes
    Unfinished,
    /// File was skipped by the ignore-older policy
    Ignored,
}

impl FileStatus {
    /// Label value used in exported metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Unfinished => "unfinished",
            FileStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
