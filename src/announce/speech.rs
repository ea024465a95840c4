//! Speech phase: server-rendered audio, local speech, or silence.

use crate::announce::completion::{PhaseGuard, PhaseState};
use crate::announce::local_speech::LocalSpeech;
use crate::audio::{AudioClip, LazyOutput, Playback, PlaybackEnd};
use crate::backend::{MonitorBackend, SpeechPayload};
use crate::config::SpeechConfig;
use crate::defaults;
use crate::error::{MonitorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// How the speech phase resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Server audio played (to its end or to a playback error).
    Server,
    /// Local speech spoke the text.
    Local,
    /// Nothing could speak; completed without sound.
    Silent,
    /// The phase bound expired.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub server_tts: bool,
    pub local_enabled: bool,
    pub timeout: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for SpeechSettings {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            server_tts: config.server_tts,
            local_enabled: config.local_enabled,
            timeout: config.timeout(),
        }
    }
}

/// Runs the speech phase of an announcement.
pub struct SpeechPhase {
    backend: Arc<dyn MonitorBackend>,
    output: Arc<LazyOutput>,
    local: Arc<dyn LocalSpeech>,
    settings: SpeechSettings,
}

impl SpeechPhase {
    pub fn new(
        backend: Arc<dyn MonitorBackend>,
        output: Arc<LazyOutput>,
        local: Arc<dyn LocalSpeech>,
        settings: SpeechSettings,
    ) -> Self {
        Self {
            backend,
            output,
            local,
            settings,
        }
    }

    /// Speak `text`. Always resolves, within the configured timeout.
    pub async fn run(&self, text: &str) -> SpeechOutcome {
        let guard = PhaseGuard::new("speech");

        if timeout(self.settings.timeout, self.attempt(&guard, text))
            .await
            .is_err()
        {
            tracing::debug!(state = ?guard.state(), "speech phase timed out");
            guard.complete(SpeechOutcome::TimedOut);
        }

        guard.outcome().unwrap_or(SpeechOutcome::TimedOut)
    }

    async fn attempt(&self, guard: &PhaseGuard<SpeechOutcome>, text: &str) {
        if self.settings.server_tts {
            guard.advance(PhaseState::AttemptPrimary);
            match self.start_server_speech(text).await {
                Ok(playback) => {
                    self.finish_playback(playback).await;
                    guard.complete(SpeechOutcome::Server);
                    return;
                }
                Err(e) => tracing::debug!("server speech unavailable, using local speech: {}", e),
            }
        }

        guard.advance(PhaseState::AttemptFallback);
        guard.complete(self.speak_locally(text).await);
    }

    /// Request, decode and start server audio. Any error here means "fall back".
    async fn start_server_speech(&self, text: &str) -> Result<Playback> {
        let (bytes, content_type) = match self.backend.synthesize_speech(text).await? {
            SpeechPayload::Audio {
                bytes,
                content_type,
            } => (bytes, content_type),
            SpeechPayload::NotAudio { content_type } => {
                return Err(MonitorError::Payload {
                    message: format!(
                        "TTS answered with {}",
                        content_type.as_deref().unwrap_or("no content type")
                    ),
                });
            }
        };

        let clip = AudioClip::decode(&bytes, Some(&content_type))?;
        self.output.get().await?.play(&clip)
    }

    /// Wait for server audio to end; an error mid-playback also ends the phase.
    async fn finish_playback(&self, playback: Playback) {
        let bound = playback.duration() + Duration::from_millis(defaults::PLAYBACK_GRACE_MS);
        match timeout(bound, playback.finished()).await {
            Ok(report) => match report.end {
                PlaybackEnd::Finished => {}
                PlaybackEnd::Failed(message) => {
                    tracing::debug!("server speech playback failed: {}", message)
                }
            },
            Err(_) => tracing::debug!("server speech playback did not end, giving up"),
        }
    }

    async fn speak_locally(&self, text: &str) -> SpeechOutcome {
        if !self.settings.local_enabled || !self.local.is_available() {
            tracing::debug!("local speech unavailable, announcement stays silent");
            return SpeechOutcome::Silent;
        }

        match self.local.speak(text).await {
            Ok(()) => SpeechOutcome::Local,
            Err(e) => {
                tracing::debug!("local speech failed: {}", e);
                SpeechOutcome::Silent
            }
        }
    }
}
