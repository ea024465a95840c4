//! Chime phase: configured sound, synthesized fallback, or silence.

use crate::announce::completion::{PhaseGuard, PhaseState};
use crate::audio::{AudioClip, ChimeTone, LazyOutput, Playback, PlaybackEnd, PlaybackReport};
use crate::backend::MonitorBackend;
use crate::config::ChimeConfig;
use crate::defaults;
use crate::error::{MonitorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// How the chime phase resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChimeOutcome {
    /// The configured sound played.
    Primary,
    /// The synthesized two-tone chime played.
    Synthesized,
    /// No audio output; completed without sound.
    Silent,
    /// The phase bound expired.
    TimedOut,
}

/// Timing knobs of the chime phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ChimeTimings {
    pub confirm_timeout: Duration,
    pub phase_timeout: Duration,
    pub min_progress: Duration,
    pub min_progress_fraction: f32,
}

impl Default for ChimeTimings {
    fn default() -> Self {
        Self::from(&ChimeConfig::default())
    }
}

impl From<&ChimeConfig> for ChimeTimings {
    fn from(config: &ChimeConfig) -> Self {
        Self {
            confirm_timeout: Duration::from_millis(config.confirm_timeout_ms),
            phase_timeout: Duration::from_millis(config.phase_timeout_ms),
            min_progress: Duration::from_millis(config.min_progress_ms),
            min_progress_fraction: config.min_progress_fraction,
        }
    }
}

impl ChimeTimings {
    /// Did a playback get far enough to count as the chime having been heard?
    ///
    /// Requires some progress and at least the smaller of `min_progress` and
    /// `min_progress_fraction` of the clip.
    pub fn counts_as_played(&self, report: &PlaybackReport) -> bool {
        let fraction = report
            .duration
            .mul_f32(self.min_progress_fraction.clamp(0.0, 1.0));
        report.end == PlaybackEnd::Finished
            && !report.played.is_zero()
            && report.played >= self.min_progress.min(fraction)
    }
}

/// Runs the chime phase of an announcement.
pub struct ChimePhase {
    backend: Arc<dyn MonitorBackend>,
    output: Arc<LazyOutput>,
    url: Option<String>,
    tone: ChimeTone,
    timings: ChimeTimings,
}

impl ChimePhase {
    pub fn new(
        backend: Arc<dyn MonitorBackend>,
        output: Arc<LazyOutput>,
        url: Option<String>,
        timings: ChimeTimings,
    ) -> Self {
        Self {
            backend,
            output,
            url: url.filter(|u| !u.trim().is_empty()),
            tone: ChimeTone::default(),
            timings,
        }
    }

    pub fn with_tone(mut self, tone: ChimeTone) -> Self {
        self.tone = tone;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Play the chime. Always resolves, within `phase_timeout`.
    pub async fn run(&self) -> ChimeOutcome {
        let guard = PhaseGuard::new("chime");

        if timeout(self.timings.phase_timeout, self.attempt(&guard))
            .await
            .is_err()
        {
            tracing::debug!(state = ?guard.state(), "chime phase timed out");
            guard.complete(ChimeOutcome::TimedOut);
        }

        guard.outcome().unwrap_or(ChimeOutcome::TimedOut)
    }

    async fn attempt(&self, guard: &PhaseGuard<ChimeOutcome>) {
        if let Some(url) = &self.url {
            guard.advance(PhaseState::AttemptPrimary);
            match self.play_configured(url).await {
                Ok(()) => {
                    guard.complete(ChimeOutcome::Primary);
                    return;
                }
                Err(e) => tracing::debug!("configured chime failed, synthesizing: {}", e),
            }
        }

        guard.advance(PhaseState::AttemptFallback);
        let outcome = self.play_synthesized().await;
        guard.complete(outcome);
    }

    async fn play_configured(&self, url: &str) -> Result<()> {
        let playback = timeout(self.timings.confirm_timeout, self.start_configured(url))
            .await
            .map_err(|_| MonitorError::AudioPlayback {
                message: format!(
                    "no playback progress within {:?}",
                    self.timings.confirm_timeout
                ),
            })??;

        let bound = playback.duration() + Duration::from_millis(defaults::PLAYBACK_GRACE_MS);
        let report = timeout(bound, playback.finished())
            .await
            .map_err(|_| MonitorError::AudioPlayback {
                message: "chime playback did not end".to_string(),
            })?;

        match &report.end {
            PlaybackEnd::Failed(message) => Err(MonitorError::AudioPlayback {
                message: message.clone(),
            }),
            PlaybackEnd::Finished if self.timings.counts_as_played(&report) => Ok(()),
            PlaybackEnd::Finished => Err(MonitorError::AudioPlayback {
                message: format!(
                    "chime ended too early ({:?} of {:?})",
                    report.played, report.duration
                ),
            }),
        }
    }

    /// Fetch, decode and start the configured sound, then wait for it to move.
    async fn start_configured(&self, url: &str) -> Result<Playback> {
        let bytes = self.backend.fetch_asset(url).await?;
        let clip = AudioClip::decode(&bytes, None)?;
        let mut playback = self.output.get().await?.play(&clip)?;

        // A playback that ends without progress is judged by its report.
        playback.wait_for_progress().await;
        Ok(playback)
    }

    async fn play_synthesized(&self) -> ChimeOutcome {
        let output = match self.output.get().await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("no audio output for chime: {}", e);
                return ChimeOutcome::Silent;
            }
        };

        let clip = self.tone.render(output.sample_rate());
        let playback = match output.play(&clip) {
            Ok(playback) => playback,
            Err(e) => {
                tracing::debug!("synthesized chime failed to start: {}", e);
                return ChimeOutcome::Silent;
            }
        };

        let bound = clip.duration() + Duration::from_millis(defaults::PLAYBACK_GRACE_MS);
        match timeout(bound, playback.finished()).await {
            Ok(report) if report.end == PlaybackEnd::Finished => {}
            Ok(report) => tracing::debug!("synthesized chime ended: {:?}", report.end),
            Err(_) => tracing::debug!("synthesized chime did not end"),
        }
        ChimeOutcome::Synthesized
    }
}
