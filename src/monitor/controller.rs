//! Lifecycle owner of the live-announcement pipeline.
//!
//! poller → (snapshot channel) → detector → queue → announcer

use crate::announce::Announce;
use crate::backend::{MonitorBackend, WindowState};
use crate::config::Config;
use crate::monitor::detector::TransitionDetector;
use crate::monitor::poller::StatePoller;
use crate::monitor::queue::AnnouncementQueue;
use crate::monitor::template::AnnouncementTemplate;
use crate::monitor::types::AnnouncementItem;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Settings of the polling and detection stages.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub collision_window: Duration,
    pub template: AnnouncementTemplate,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.monitor.poll_interval(),
            collision_window: config.monitor.collision_window(),
            template: AnnouncementTemplate::from_config(&config.monitor),
        }
    }
}

/// Owns every task and all mutable pipeline state; dropping it stops everything.
pub struct MonitorController {
    display: watch::Receiver<Vec<WindowState>>,
    queue: AnnouncementQueue,
    detector: Arc<Mutex<TransitionDetector>>,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorController {
    /// Start polling `backend` and announcing through `announcer`.
    pub fn start(
        backend: Arc<dyn MonitorBackend>,
        announcer: Arc<dyn Announce>,
        settings: MonitorSettings,
    ) -> Self {
        let (display_tx, display_rx) = watch::channel(Vec::new());
        let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel::<Vec<WindowState>>();
        let mut controller = Self::with_display(announcer, &settings, display_rx);

        let detector = Arc::clone(&controller.detector);
        let queue = controller.queue.clone();
        let detection = tokio::spawn(async move {
            while let Some(snapshot) = snapshot_rx.recv().await {
                detect_and_enqueue(&detector, &queue, &snapshot);
            }
        });
        let poller = StatePoller::new(backend, settings.poll_interval).spawn(display_tx, snapshot_tx);

        controller.tasks.push(detection);
        controller.tasks.push(poller);
        tracing::info!(
            interval = ?settings.poll_interval,
            collision_window = ?settings.collision_window,
            "monitor started"
        );
        controller
    }

    /// Controller without a poller: snapshots are fed through [`Self::on_snapshot`].
    pub fn manual(announcer: Arc<dyn Announce>, settings: MonitorSettings) -> Self {
        let (_display_tx, display_rx) = watch::channel(Vec::new());
        Self::with_display(announcer, &settings, display_rx)
    }

    fn with_display(
        announcer: Arc<dyn Announce>,
        settings: &MonitorSettings,
        display: watch::Receiver<Vec<WindowState>>,
    ) -> Self {
        let queue = AnnouncementQueue::new();
        let worker = queue.spawn_worker(announcer);
        let detector = TransitionDetector::new(settings.template.clone(), settings.collision_window);

        Self {
            display,
            queue,
            detector: Arc::new(Mutex::new(detector)),
            tasks: vec![worker],
        }
    }

    /// Current display state; `changed()` fires on every successful poll.
    pub fn display(&self) -> watch::Receiver<Vec<WindowState>> {
        self.display.clone()
    }

    /// Run detection on `snapshot` and queue what it finds. Returns the number queued.
    pub fn on_snapshot(&self, snapshot: &[WindowState]) -> usize {
        detect_and_enqueue(&self.detector, &self.queue, snapshot)
    }

    /// Queue announcements directly.
    pub fn enqueue(&self, items: Vec<AnnouncementItem>) {
        self.queue.enqueue(items);
    }

    pub fn queue(&self) -> &AnnouncementQueue {
        &self.queue
    }

    /// Stop polling and abort the announcement in progress.
    pub fn shutdown(mut self) {
        self.abort_all();
        tracing::info!("monitor stopped");
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for MonitorController {
    fn drop(&mut self) {
        self.abort_all();
    }
}

fn detect_and_enqueue(
    detector: &Mutex<TransitionDetector>,
    queue: &AnnouncementQueue,
    snapshot: &[WindowState],
) -> usize {
    let items = detector
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .detect(snapshot, &queue.dedup_view(), Instant::now());
    let count = items.len();
    queue.enqueue(items);
    count
}
