//! Plays one announcement: duck video, chime, speech, restore video.

use crate::announce::chime::{ChimeOutcome, ChimePhase, ChimeTimings};
use crate::announce::local_speech::LocalSpeech;
use crate::announce::speech::{SpeechOutcome, SpeechPhase, SpeechSettings};
use crate::audio::LazyOutput;
use crate::backend::MonitorBackend;
use crate::config::Config;
use crate::monitor::types::AnnouncementItem;
use crate::video::DuckingController;
use async_trait::async_trait;
use std::sync::Arc;

/// How each phase of an announcement resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementReport {
    pub chime: ChimeOutcome,
    pub speech: SpeechOutcome,
}

/// Anything that can play an announcement to completion.
///
/// `announce` never fails: every error is absorbed by a fallback or ends the
/// announcement silently.
#[async_trait]
pub trait Announce: Send + Sync {
    async fn announce(&self, item: &AnnouncementItem) -> AnnouncementReport;
}

/// Audio announcer: chime then speech, with the background video ducked.
pub struct Announcer {
    chime: ChimePhase,
    speech: SpeechPhase,
    ducking: DuckingController,
    duck_volume: f32,
}

impl Announcer {
    pub fn new(
        chime: ChimePhase,
        speech: SpeechPhase,
        ducking: DuckingController,
        duck_volume: f32,
    ) -> Self {
        Self {
            chime,
            speech,
            ducking,
            duck_volume,
        }
    }

    /// Wire both phases from configuration around a shared audio output.
    pub fn from_config(
        config: &Config,
        backend: Arc<dyn MonitorBackend>,
        output: Arc<LazyOutput>,
        local: Arc<dyn LocalSpeech>,
        ducking: DuckingController,
        chime_url: Option<String>,
    ) -> Self {
        let chime = ChimePhase::new(
            Arc::clone(&backend),
            Arc::clone(&output),
            chime_url,
            ChimeTimings::from(&config.chime),
        );
        let speech = SpeechPhase::new(backend, output, local, SpeechSettings::from(&config.speech));
        Self::new(chime, speech, ducking, config.video.duck_volume)
    }

    pub fn chime_url(&self) -> Option<&str> {
        self.chime.url()
    }

    /// Only the chime phase, with ducking (operator test).
    pub async fn chime_only(&self) -> ChimeOutcome {
        let _duck = self.ducking.bracket(self.duck_volume);
        self.chime.run().await
    }
}

#[async_trait]
impl Announce for Announcer {
    async fn announce(&self, item: &AnnouncementItem) -> AnnouncementReport {
        let _duck = self.ducking.bracket(self.duck_volume);

        let chime = self.chime.run().await;
        let speech = self.speech.run(&item.text).await;

        tracing::info!(key = %item.key, ?chime, ?speech, "announced: {}", item.text);
        AnnouncementReport { chime, speech }
    }
}
