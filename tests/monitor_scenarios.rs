//! End-to-end monitor scenarios: detection, deduplication and serialized playback.

use async_trait::async_trait;
use nowserving::announce::{
    Announce, AnnouncementReport, Announcer, ChimeOutcome, MockSpeech, SpeechOutcome,
};
use nowserving::audio::{LazyOutput, MockOutput, MockOutputProvider};
use nowserving::backend::{MockBackend, MockTts, ServingClient, WindowId, WindowState};
use nowserving::config::Config;
use nowserving::monitor::{AnnouncementItem, AnnouncementKey, MonitorController, MonitorSettings};
use nowserving::video::DuckingController;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Announcer that records texts and completes instantly.
#[derive(Default)]
struct RecordingAnnouncer {
    texts: Mutex<Vec<String>>,
}

impl RecordingAnnouncer {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Announce for RecordingAnnouncer {
    async fn announce(&self, item: &AnnouncementItem) -> AnnouncementReport {
        self.texts.lock().unwrap().push(item.text.clone());
        AnnouncementReport {
            chime: ChimeOutcome::Silent,
            speech: SpeechOutcome::Silent,
        }
    }
}

/// Wraps a real announcer and tracks how many announcements overlap.
struct OverlapTracker {
    inner: Announcer,
    active: AtomicUsize,
    max_active: AtomicUsize,
    done: AtomicUsize,
}

#[async_trait]
impl Announce for OverlapTracker {
    async fn announce(&self, item: &AnnouncementItem) -> AnnouncementReport {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let report = self.inner.announce(item).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.done.fetch_add(1, Ordering::SeqCst);
        report
    }
}

fn window(queue_number: Option<&str>, client_name: Option<&str>) -> WindowState {
    WindowState {
        id: WindowId::new("1"),
        label: "Window 1".to_string(),
        staff: None,
        current_serving: queue_number.map(|n| ServingClient {
            queue_number: Some(n.to_string()),
            client_name: client_name.map(str::to_string),
            ..ServingClient::default()
        }),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn first_snapshot_is_never_announced() {
    let announcer = Arc::new(RecordingAnnouncer::default());
    let controller = MonitorController::manual(announcer.clone(), MonitorSettings::default());

    assert_eq!(controller.on_snapshot(&[window(Some("012526-0007"), Some("Juan"))]), 0);
    settle().await;

    assert!(announcer.texts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_serving_number_is_announced_once() {
    let announcer = Arc::new(RecordingAnnouncer::default());
    let controller = MonitorController::manual(announcer.clone(), MonitorSettings::default());

    controller.on_snapshot(&[window(None, None)]);
    assert_eq!(controller.on_snapshot(&[window(Some("012526-0007"), Some("Juan"))]), 1);
    // Same state again: no transition
    assert_eq!(controller.on_snapshot(&[window(Some("012526-0007"), Some("Juan"))]), 0);
    settle().await;

    let texts = announcer.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains('7'));
    assert!(texts[0].contains(", Juan"));
    assert!(!texts[0].contains("0007"));
}

#[tokio::test(start_paused = true)]
async fn repeated_key_is_suppressed_within_collision_window() {
    let announcer = Arc::new(RecordingAnnouncer::default());
    let controller = MonitorController::manual(announcer.clone(), MonitorSettings::default());

    controller.on_snapshot(&[window(None, None)]);
    assert_eq!(controller.on_snapshot(&[window(Some("A-0003"), None)]), 1);
    settle().await;
    assert_eq!(announcer.texts().len(), 1);

    // 5 s after completion: the window flips away and back, still a duplicate
    tokio::time::sleep(Duration::from_millis(5000)).await;
    controller.on_snapshot(&[window(None, None)]);
    assert_eq!(controller.on_snapshot(&[window(Some("A-0003"), None)]), 0);

    // 10 s after completion: outside the 8 s window, announced again
    tokio::time::sleep(Duration::from_millis(5000)).await;
    controller.on_snapshot(&[window(None, None)]);
    assert_eq!(controller.on_snapshot(&[window(Some("A-0003"), None)]), 1);
    settle().await;

    assert_eq!(announcer.texts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rapid_enqueues_play_one_at_a_time() {
    let output = Arc::new(MockOutput::new());
    let speech = Arc::new(MockSpeech::new().with_duration(Duration::from_millis(300)));
    let inner = Announcer::from_config(
        &Config::default(),
        Arc::new(MockBackend::new().with_tts(MockTts::Html)),
        Arc::new(LazyOutput::new(Arc::new(MockOutputProvider::new(output.clone())))),
        speech.clone(),
        DuckingController::disabled(),
        None,
    );
    let tracker = Arc::new(OverlapTracker {
        inner,
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
        done: AtomicUsize::new(0),
    });
    let controller = MonitorController::manual(tracker.clone(), MonitorSettings::default());

    for i in 0..10 {
        controller.enqueue(vec![AnnouncementItem {
            text: format!("Now serving number {i}"),
            key: AnnouncementKey::new("1", &format!("A-{i}")),
        }]);
    }

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(tracker.done.load(Ordering::SeqCst), 10);
    assert_eq!(tracker.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(output.max_concurrent(), 1);
    let expected: Vec<String> = (0..10).map(|i| format!("Now serving number {i}")).collect();
    assert_eq!(speech.spoken(), expected);
}
