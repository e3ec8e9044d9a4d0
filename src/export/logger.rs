//! Structured log record for an export window

use std::collections::BTreeMap;

use crate::error::Result;
use crate::eventbus::Topic;
use crate::store::StoreSnapshot;
use crate::types::WatchSnapshot;

use super::LogSink;

/// Serialize the whole window as one JSON object
///
/// Keys are the flattened `pipeline-source` form of each
/// [`SnapshotKey`](crate::types::SnapshotKey); values are the snapshots
/// with their file records. Nothing is filtered or classified.
pub fn render_log(window: &StoreSnapshot) -> Result<Vec<u8>> {
    let record: BTreeMap<String, &WatchSnapshot> = window
        .iter()
        .map(|(key, snapshot)| (key.to_string(), snapshot))
        .collect();
    Ok(serde_json::to_vec(&record)?)
}

/// Ships records through `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn export(&self, topic: Topic, payload: &[u8]) -> Result<()> {
        tracing::info!(
            topic = %topic,
            bytes = payload.len(),
            "{}",
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }
}
