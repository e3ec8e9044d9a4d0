//! Background service framework
//!
//! A [`Service`] runs a long-lived loop until its shutdown channel fires.
//! [`ServiceHandle`] owns the spawned task and the sending half of that
//! channel.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Lifecycle state of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Not running (initial and final state)
    Stopped,
    /// Loop is active
    Running,
    /// Loop exited with an error
    Failed(String),
}

/// Errors reported by services
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Service refused to start
    #[error("Service failed to start: {0}")]
    StartFailed(String),

    /// Service task panicked or was cancelled
    #[error("Service task failed: {0}")]
    Join(String),
}

/// A long-running background service
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// Run until a shutdown signal arrives or the channel closes
    async fn start(&self, shutdown: broadcast::Receiver<()>) -> Result<(), ServiceError>;

    /// Service name for logs
    fn name(&self) -> &'static str;

    /// Current lifecycle state
    fn status(&self) -> ServiceStatus;
}

/// Handle to a spawned service
pub struct ServiceHandle {
    name: &'static str,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<Result<(), ServiceError>>,
}

impl ServiceHandle {
    /// Spawn `service` on the current tokio runtime
    pub fn spawn<S>(service: Arc<S>) -> Self
    where
        S: Service + 'static,
    {
        let (shutdown, rx) = broadcast::channel(1);
        let name = service.name();
        let task = tokio::spawn(async move { service.start(rx).await });
        tracing::debug!(service = name, "Service spawned");

        Self {
            name,
            shutdown,
            task,
        }
    }

    /// Signal shutdown and wait for the service to exit
    pub async fn stop(self) -> Result<(), ServiceError> {
        // The service may already have exited and dropped its receiver
        let _ = self.shutdown.send(());
        let result = self
            .task
            .await
            .map_err(|e| ServiceError::Join(e.to_string()))?;
        tracing::debug!(service = self.name, "Service stopped");
        result
    }
}
