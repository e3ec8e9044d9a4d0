//! Error types for the exporter

use thiserror::Error;

use crate::eventbus::Topic;

/// Main error type for the exporter
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// A listener received an event for a topic it does not handle
    #[error("Listener {listener} cannot handle event on topic {topic}")]
    UnexpectedEvent {
        /// Listener that rejected the event
        listener: &'static str,
        /// Topic of the rejected event
        topic: Topic,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
