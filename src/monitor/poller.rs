//! Periodic fetch of the public window state.

use crate::backend::{MonitorBackend, WindowState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Polls `GET /queue/public/windows` on a fixed interval.
pub struct StatePoller {
    backend: Arc<dyn MonitorBackend>,
    interval: Duration,
}

impl StatePoller {
    pub fn new(backend: Arc<dyn MonitorBackend>, interval: Duration) -> Self {
        Self { backend, interval }
    }

    /// Start polling: the first fetch happens immediately.
    ///
    /// Each successful snapshot replaces the display state right away and is then
    /// handed to `snapshots` for transition detection. A failed poll keeps the
    /// previous display state. The task ends when the `snapshots` receiver is gone.
    pub fn spawn(
        self,
        display: watch::Sender<Vec<WindowState>>,
        snapshots: mpsc::UnboundedSender<Vec<WindowState>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.backend.fetch_windows().await {
                    Ok(windows) => {
                        display.send_replace(windows.clone());
                        if snapshots.send(windows).is_err() {
                            tracing::debug!("snapshot receiver gone, poller stopping");
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Failed to load windows: {}", e),
                }
            }
        })
    }
}
