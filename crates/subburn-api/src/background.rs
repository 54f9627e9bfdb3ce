//! Tracked background tasks that outlive their request.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Spawns request-detached work and lets shutdown wait for it.
///
/// Failures are logged only; nothing reports back to the client.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F, E>(&self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.tracker.spawn(async move {
            if let Err(e) = task.await {
                error!(task = name, "Background task failed: {}", e);
            }
        });
    }

    /// Number of tasks still running.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Stop accepting new tasks and wait for running ones, up to `timeout`.
    /// Returns `false` if tasks were still running when the timeout hit.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!("Waiting for {} background task(s)", pending);
        }
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "Shutdown timeout reached with {} background task(s) still running",
                    self.tracker.len()
                );
                false
            }
        }
    }
}
