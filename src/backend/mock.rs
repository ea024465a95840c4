//! Scriptable in-memory backend for tests and offline runs.

use crate::backend::client::MonitorBackend;
use crate::backend::types::{SpeechPayload, Video, WindowState};
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// How the mock answers `POST /tts`.
#[derive(Debug, Clone)]
pub enum MockTts {
    /// Return these bytes as `audio/wav`.
    Audio(Vec<u8>),
    /// Return an HTML page.
    Html,
    /// Fail the request.
    Fail,
}

/// Mock backend with scripted window snapshots.
///
/// Each `fetch_windows` call pops the next scripted response; once the script is
/// exhausted the last successful snapshot repeats.
pub struct MockBackend {
    windows: Mutex<VecDeque<Result<Vec<WindowState>>>>,
    last_windows: Mutex<Vec<WindowState>>,
    videos: Vec<Video>,
    ding_sound_url: Option<String>,
    tts: MockTts,
    assets: HashMap<String, Vec<u8>>,
    window_polls: AtomicUsize,
    tts_requests: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(VecDeque::new()),
            last_windows: Mutex::new(Vec::new()),
            videos: Vec::new(),
            ding_sound_url: None,
            tts: MockTts::Html,
            assets: HashMap::new(),
            window_polls: AtomicUsize::new(0),
            tts_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a snapshot to be returned by the next poll.
    pub fn with_snapshot(self, windows: Vec<WindowState>) -> Self {
        self.push_snapshot(windows);
        self
    }

    /// Queue a failed poll.
    pub fn with_poll_failure(self) -> Self {
        self.lock_windows().push_back(Err(MonitorError::Http {
            message: "mock poll failure".to_string(),
        }));
        self
    }

    pub fn with_videos(mut self, urls: &[&str]) -> Self {
        self.videos = urls
            .iter()
            .map(|url| Video {
                url: url.to_string(),
            })
            .collect();
        self
    }

    pub fn with_ding_sound_url(mut self, url: &str) -> Self {
        self.ding_sound_url = Some(url.to_string());
        self
    }

    pub fn with_tts(mut self, tts: MockTts) -> Self {
        self.tts = tts;
        self
    }

    /// Serve `bytes` for `url` from `fetch_asset`; unknown URLs answer 404.
    pub fn with_asset(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.assets.insert(url.to_string(), bytes);
        self
    }

    /// Queue a snapshot after construction (e.g. while the poller runs).
    pub fn push_snapshot(&self, windows: Vec<WindowState>) {
        self.lock_windows().push_back(Ok(windows));
    }

    /// Number of `fetch_windows` calls so far.
    pub fn window_polls(&self) -> usize {
        self.window_polls.load(Ordering::SeqCst)
    }

    /// Texts sent to `POST /tts`.
    pub fn tts_requests(&self) -> Vec<String> {
        self.tts_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_windows(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Vec<WindowState>>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MonitorBackend for MockBackend {
    async fn fetch_windows(&self) -> Result<Vec<WindowState>> {
        self.window_polls.fetch_add(1, Ordering::SeqCst);
        let next = self.lock_windows().pop_front();
        let mut last = self
            .last_windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match next {
            Some(Ok(windows)) => {
                *last = windows.clone();
                Ok(windows)
            }
            Some(Err(e)) => Err(e),
            None => Ok(last.clone()),
        }
    }

    async fn fetch_videos(&self) -> Result<Vec<Video>> {
        Ok(self.videos.clone())
    }

    async fn fetch_ding_sound_url(&self) -> Result<Option<String>> {
        Ok(self.ding_sound_url.clone())
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechPayload> {
        self.tts_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        match &self.tts {
            MockTts::Audio(bytes) => Ok(SpeechPayload::classify(Some("audio/wav"), bytes.clone())),
            MockTts::Html => Ok(SpeechPayload::classify(
                Some("text/html"),
                b"<!doctype html><html></html>".to_vec(),
            )),
            MockTts::Fail => Err(MonitorError::HttpStatus {
                url: "mock://tts".to_string(),
                status: 500,
            }),
        }
    }

    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| MonitorError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}
