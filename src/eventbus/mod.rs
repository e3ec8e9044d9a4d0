//! In-process event bus boundary
//!
//! Upstream components publish typed [`Event`]s; listeners declare the
//! [`Topic`]s they consume and are registered explicitly by the composition
//! root. Each topic carries exactly one payload shape, so a listener only
//! ever sees the variant it asked for unless the wiring is wrong, in which
//! case it reports [`Error::UnexpectedEvent`](crate::Error::UnexpectedEvent).
//!
//! ```text
//!  file source ──publish──▶ EventBus ──subscribe──▶ FileWatcherListener
//!                              │
//!                              └────────subscribe──▶ other listeners
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Topics and payloads
// ============================================================================

/// Named topics on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Periodic watch reports from file sources
    FileWatcher,
    /// Per-sink delivery counters
    Sink,
}

impl Topic {
    /// Wire name of the topic
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::FileWatcher => "filewatcher",
            Topic::Sink => "sink",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file as reported by a file source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_name: String,
    pub size: i64,
    pub offset: i64,
    pub last_modify_time: DateTime<Utc>,
    pub is_ignore_older: bool,
}

/// Watch report published on [`Topic::FileWatcher`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchMetricData {
    pub pipeline_name: String,
    pub source_name: String,
    #[serde(default)]
    pub file_infos: Vec<FileInfo>,
    pub total_file_count: u64,
    pub inactive_fd_count: u64,
}

/// Delivery counters published on [`Topic::Sink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkMetricData {
    pub pipeline_name: String,
    pub sink_name: String,
    pub success_count: u64,
    pub fail_count: u64,
}

/// Event carried by the bus, one variant per topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Watch report from a file source
    FileWatcher(WatchMetricData),
    /// Sink delivery counters
    Sink(SinkMetricData),
}

impl Event {
    /// Topic this event is routed on
    pub fn topic(&self) -> Topic {
        match self {
            Event::FileWatcher(_) => Topic::FileWatcher,
            Event::Sink(_) => Topic::Sink,
        }
    }
}

// ============================================================================
// Listener registry
// ============================================================================

/// A consumer of bus events
pub trait Listener: Send + Sync {
    /// Listener name, used in logs and errors
    fn name(&self) -> &'static str;

    /// Topics this listener is registered for
    fn topics(&self) -> &'static [Topic];

    /// Handle one event. Must not block.
    fn subscribe(&self, event: Event) -> Result<()>;
}

/// Synchronous fan-out bus
///
/// Publishing calls every listener registered for the event's topic on the
/// caller's thread. Publishers on different threads may overlap freely.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<Topic, Vec<Arc<dyn Listener>>>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for all of its topics
    pub fn register(&self, listener: Arc<dyn Listener>) {
        let mut listeners = self.listeners.write();
        for topic in listener.topics() {
            tracing::debug!(listener = listener.name(), topic = %topic, "Listener registered");
            listeners.entry(*topic).or_default().push(listener.clone());
        }
    }

    /// Number of listeners registered for a topic
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.listeners.read().get(&topic).map_or(0, Vec::len)
    }

    /// Deliver an event to every listener of its topic
    ///
    /// Every listener is called even if an earlier one fails; the first
    /// failure is returned.
    pub fn publish(&self, event: Event) -> Result<()> {
        let topic = event.topic();
        let targets = match self.listeners.read().get(&topic) {
            Some(targets) => targets.clone(),
            None => {
                tracing::trace!(topic = %topic, "No listener for event");
                return Ok(());
            }
        };

        let mut first_error = None;
        for listener in targets {
            if let Err(e) = listener.subscribe(event.clone()) {
                tracing::error!(listener = listener.name(), topic = %topic, error = %e, "Listener rejected event");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
