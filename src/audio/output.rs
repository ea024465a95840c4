//! Audio output seam.
//!
//! An [`AudioOutput`] plays a clip and hands back a [`Playback`] that reports
//! progress and exactly one end event. Outputs are opened lazily through an
//! [`OutputProvider`] and reused for the rest of the session, so a machine
//! without a sound card only fails when something actually tries to play.

use crate::audio::clip::AudioClip;
use crate::error::{MonitorError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

/// How a playback ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEnd {
    /// Reached the end of the clip.
    Finished,
    /// The device reported an error or the playback was torn down.
    Failed(String),
}

/// Final state of a playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub played: Duration,
    pub duration: Duration,
    pub end: PlaybackEnd,
}

/// Listener side of a running playback. Dropping it stops the sound.
pub struct Playback {
    progress: watch::Receiver<Duration>,
    done: oneshot::Receiver<PlaybackEnd>,
    duration: Duration,
    stop: Arc<AtomicBool>,
}

/// Producer side, held by whatever renders the samples.
pub struct PlaybackControls {
    progress: watch::Sender<Duration>,
    done: Option<oneshot::Sender<PlaybackEnd>>,
    stop: Arc<AtomicBool>,
}

impl Playback {
    /// Create a connected playback/controls pair for a clip of `duration`.
    pub fn channel(duration: Duration) -> (Playback, PlaybackControls) {
        let (progress_tx, progress_rx) = watch::channel(Duration::ZERO);
        let (done_tx, done_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));

        (
            Playback {
                progress: progress_rx,
                done: done_rx,
                duration,
                stop: Arc::clone(&stop),
            },
            PlaybackControls {
                progress: progress_tx,
                done: Some(done_tx),
                stop,
            },
        )
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// How much has been played so far.
    pub fn position(&self) -> Duration {
        *self.progress.borrow()
    }

    /// Wait until playback has advanced past zero.
    ///
    /// Returns `false` when the playback ended before any progress was reported.
    pub async fn wait_for_progress(&mut self) -> bool {
        self.progress.wait_for(|p| !p.is_zero()).await.is_ok()
    }

    /// Wait for the end event and report what was played.
    pub async fn finished(mut self) -> PlaybackReport {
        let end = match (&mut self.done).await {
            Ok(end) => end,
            Err(_) => PlaybackEnd::Failed("playback dropped without an end event".to_string()),
        };
        PlaybackReport {
            played: *self.progress.borrow(),
            duration: self.duration,
            end,
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl PlaybackControls {
    pub fn report_progress(&self, played: Duration) {
        self.progress.send_replace(played);
    }

    /// True once the listener went away or asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Deliver the single end event.
    pub fn finish(mut self, end: PlaybackEnd) {
        if let Some(done) = self.done.take() {
            // The listener may already be gone (timed out); nothing to tell.
            done.send(end).ok();
        }
    }
}

/// A device that can play clips.
pub trait AudioOutput: Send + Sync {
    /// Start playing `clip`; returns immediately.
    fn play(&self, clip: &AudioClip) -> Result<Playback>;

    /// Native rate of the device (synthesized sounds are rendered at it).
    fn sample_rate(&self) -> u32;

    /// False once the device has failed for good and should be reopened.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Opens an audio output. May fail (no device, no sound server).
pub trait OutputProvider: Send + Sync {
    fn open(&self) -> Result<Arc<dyn AudioOutput>>;
}

/// Provider used when audio is disabled or not compiled in.
#[derive(Debug, Clone, Default)]
pub struct NullProvider {
    reason: String,
}

impl NullProvider {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

impl OutputProvider for NullProvider {
    fn open(&self) -> Result<Arc<dyn AudioOutput>> {
        Err(MonitorError::AudioUnavailable {
            message: self.reason.clone(),
        })
    }
}

/// Lazily-opened output shared by every announcement.
///
/// The first successful `open` is cached; failures are not, so a sound server
/// that comes up later is picked up by the next announcement. A cached output
/// that has gone unhealthy is dropped and reopened.
///
/// Opening a device can block for as long as the sound server likes, so it runs
/// on the blocking pool and callers may time out while it is in flight. At most
/// one open runs at a time; a late success is still cached.
pub struct LazyOutput {
    provider: Arc<dyn OutputProvider>,
    cached: Arc<Mutex<Option<Arc<dyn AudioOutput>>>>,
    opening: Arc<AtomicBool>,
}

impl LazyOutput {
    pub fn new(provider: Arc<dyn OutputProvider>) -> Self {
        Self {
            provider,
            cached: Arc::new(Mutex::new(None)),
            opening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn AudioOutput>> {
        {
            let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(output) = cached.as_ref() {
                if output.is_healthy() {
                    return Ok(Arc::clone(output));
                }
                tracing::info!("audio output failed, reopening");
                *cached = None;
            }
        }

        if self.opening.swap(true, Ordering::SeqCst) {
            return Err(MonitorError::AudioUnavailable {
                message: "audio output is still opening".to_string(),
            });
        }

        let provider = Arc::clone(&self.provider);
        let cached = Arc::clone(&self.cached);
        let opening = Arc::clone(&self.opening);
        tokio::task::spawn_blocking(move || {
            let result = provider.open();
            if let Ok(output) = &result {
                *cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(output));
            }
            opening.store(false, Ordering::SeqCst);
            result
        })
        .await
        .map_err(|e| MonitorError::AudioUnavailable {
            message: format!("audio open task failed: {}", e),
        })?
    }

    pub fn is_open(&self) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Scripted behavior of one mock playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockPlayback {
    /// Progress immediately, end after the clip's duration.
    Normal,
    /// End right away without any progress (a 0-second play).
    Silent,
    /// Play this long, then end "naturally".
    EndAfter(Duration),
    /// Report an error after a short delay.
    Fail,
    /// Never progress and never end until dropped.
    Hang,
}

/// Mock output driven by tokio timers (works with paused time).
pub struct MockOutput {
    script: Mutex<VecDeque<MockPlayback>>,
    default: MockPlayback,
    sample_rate: u32,
    played: Mutex<Vec<Duration>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default: MockPlayback::Normal,
            sample_rate: 16_000,
            played: Mutex::new(Vec::new()),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Behavior for playbacks once the script runs out.
    pub fn with_default(mut self, behavior: MockPlayback) -> Self {
        self.default = behavior;
        self
    }

    /// Behaviors for the next playbacks, in order.
    pub fn with_script(self, behaviors: &[MockPlayback]) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(behaviors.iter().copied());
        self
    }

    /// Durations of every clip handed to `play`.
    pub fn played(&self) -> Vec<Duration> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of simultaneously running playbacks.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for MockOutput {
    fn play(&self, clip: &AudioClip) -> Result<Playback> {
        let behavior = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.default);
        let duration = clip.duration();
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);

        let (playback, controls) = Playback::channel(duration);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            match behavior {
                MockPlayback::Normal => {
                    controls.report_progress(Duration::from_millis(1).min(duration));
                    tokio::time::sleep(duration).await;
                    controls.report_progress(duration);
                    controls.finish(PlaybackEnd::Finished);
                }
                MockPlayback::Silent => controls.finish(PlaybackEnd::Finished),
                MockPlayback::EndAfter(played) => {
                    controls.report_progress(played);
                    tokio::time::sleep(played).await;
                    controls.finish(PlaybackEnd::Finished);
                }
                MockPlayback::Fail => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    controls.finish(PlaybackEnd::Failed("mock device error".to_string()));
                }
                MockPlayback::Hang => {
                    while !controls.is_stopped() {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
            active.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(playback)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Provider handing out a shared [`MockOutput`], or failing like a machine
/// without a sound card.
pub struct MockOutputProvider {
    output: Option<Arc<MockOutput>>,
    opens: AtomicUsize,
}

impl MockOutputProvider {
    pub fn new(output: Arc<MockOutput>) -> Self {
        Self {
            output: Some(output),
            opens: AtomicUsize::new(0),
        }
    }

    /// Every `open` fails.
    pub fn failing() -> Self {
        Self {
            output: None,
            opens: AtomicUsize::new(0),
        }
    }

    /// Number of `open` calls.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl OutputProvider for MockOutputProvider {
    fn open(&self) -> Result<Arc<dyn AudioOutput>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match &self.output {
            Some(output) => Ok(Arc::clone(output) as Arc<dyn AudioOutput>),
            None => Err(MonitorError::AudioUnavailable {
                message: "mock output construction failed".to_string(),
            }),
        }
    }
}
