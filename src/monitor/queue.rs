//! Ordered announcement queue with a single consumer.

use crate::announce::Announce;
use crate::monitor::types::{AnnouncementItem, DedupView, LastAnnounced};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<AnnouncementItem>,
    in_flight: Option<AnnouncementItem>,
    last: Option<LastAnnounced>,
}

/// FIFO of announcements, played strictly one at a time.
///
/// Cloning gives another handle to the same queue.
#[derive(Clone, Default)]
pub struct AnnouncementQueue {
    state: Arc<Mutex<QueueState>>,
    wake: Arc<Notify>,
}

impl AnnouncementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append items at the tail and wake the consumer.
    pub fn enqueue(&self, items: Vec<AnnouncementItem>) {
        if items.is_empty() {
            return;
        }
        {
            let mut state = self.lock();
            for item in items {
                tracing::debug!(key = %item.key, "announcement queued");
                state.pending.push_back(item);
            }
        }
        self.wake.notify_one();
    }

    /// Snapshot of queued keys and the last completed announcement.
    pub fn dedup_view(&self) -> DedupView {
        let state = self.lock();
        DedupView {
            queued: state
                .pending
                .iter()
                .chain(state.in_flight.as_ref())
                .map(|item| item.key.clone())
                .collect(),
            last: state.last.clone(),
        }
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn in_flight(&self) -> Option<AnnouncementItem> {
        self.lock().in_flight.clone()
    }

    pub fn last_announced(&self) -> Option<LastAnnounced> {
        self.lock().last.clone()
    }

    /// Start the single consumer. Aborting the returned task also aborts the
    /// announcement it is playing.
    pub fn spawn_worker(&self, announcer: Arc<dyn Announce>) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move { queue.run_worker(announcer).await })
    }

    async fn run_worker(self, announcer: Arc<dyn Announce>) {
        loop {
            let Some(item) = self.take_next() else {
                self.wake.notified().await;
                continue;
            };

            // Own task per announcement: a panic is contained and the queue moves on.
            let task_announcer = Arc::clone(&announcer);
            let task_item = item.clone();
            let mut task = AbortOnDrop(tokio::spawn(async move {
                task_announcer.announce(&task_item).await
            }));

            if let Err(e) = (&mut task.0).await {
                tracing::error!(key = %item.key, "announcement failed: {}", e);
            }
            self.complete(&item);
        }
    }

    fn take_next(&self) -> Option<AnnouncementItem> {
        let mut state = self.lock();
        let item = state.pending.pop_front()?;
        state.in_flight = Some(item.clone());
        Some(item)
    }

    fn complete(&self, item: &AnnouncementItem) {
        let mut state = self.lock();
        state.in_flight = None;
        state.last = Some(LastAnnounced {
            key: item.key.clone(),
            at: Instant::now(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::{AnnouncementReport, ChimeOutcome, SpeechOutcome};
    use crate::monitor::types::AnnouncementKey;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Takes one second per announcement and tracks overlap.
    #[derive(Default)]
    struct SlowAnnouncer {
        active: AtomicUsize,
        max_active: AtomicUsize,
        played: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Announce for SlowAnnouncer {
        async fn announce(&self, item: &AnnouncementItem) -> AnnouncementReport {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if item.text == "panic" {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("announcer bug");
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.played.lock().unwrap().push(item.text.clone());
            self.active.fetch_sub(1, Ordering::SeqCst);
            AnnouncementReport {
                chime: ChimeOutcome::Synthesized,
                speech: SpeechOutcome::Local,
            }
        }
    }

    fn item(n: usize) -> AnnouncementItem {
        AnnouncementItem {
            text: format!("item {n}"),
            key: AnnouncementKey::new("1", &n.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_in_order_one_at_a_time() {
        let queue = AnnouncementQueue::new();
        let announcer = Arc::new(SlowAnnouncer::default());
        let worker = queue.spawn_worker(announcer.clone());

        queue.enqueue(vec![item(1), item(2)]);
        queue.enqueue(vec![item(3)]);

        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(
            *announcer.played.lock().unwrap(),
            vec!["item 1", "item 2", "item 3"]
        );
        assert_eq!(announcer.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len(), 0);
        assert!(queue.in_flight().is_none());
        assert_eq!(queue.last_announced().unwrap().key, item(3).key);
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_key_is_in_dedup_view() {
        let queue = AnnouncementQueue::new();
        let worker = queue.spawn_worker(Arc::new(SlowAnnouncer::default()));

        queue.enqueue(vec![item(1), item(2)]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let view = queue.dedup_view();
        assert_eq!(queue.in_flight().unwrap().key, item(1).key);
        assert!(view.queued.contains(&item(1).key));
        assert!(view.queued.contains(&item(2).key));
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_announcement_does_not_stall_queue() {
        let queue = AnnouncementQueue::new();
        let announcer = Arc::new(SlowAnnouncer::default());
        let worker = queue.spawn_worker(announcer.clone());

        let mut bad = item(1);
        bad.text = "panic".to_string();
        queue.enqueue(vec![bad, item(2)]);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(*announcer.played.lock().unwrap(), vec!["item 2"]);
        worker.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_enqueue_is_noop() {
        let queue = AnnouncementQueue::new();
        queue.enqueue(Vec::new());
        assert_eq!(queue.pending_len(), 0);
    }
}
