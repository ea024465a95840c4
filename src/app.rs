//! Kiosk application entry points.
//!
//! Wires the backend client, audio output, local speech and video player into
//! the announcer, then runs the monitor or a one-shot command on top of it.

use crate::announce::{Announce, Announcer, CommandSpeech, LocalSpeech, NullSpeech};
use crate::audio::{LazyOutput, NullProvider, OutputProvider};
use crate::backend::{HttpBackend, MonitorBackend};
use crate::board::render_board;
use crate::config::Config;
use crate::defaults;
use crate::error::{MonitorError, Result};
use crate::monitor::{AnnouncementItem, AnnouncementKey, MonitorController, MonitorSettings};
use crate::video::{DuckingController, MpvIpc, VideoVolume};
use std::io::{IsTerminal, Write};
use std::sync::Arc;

/// Everything an announcement needs, built once per process.
pub struct Kiosk {
    pub backend: Arc<dyn MonitorBackend>,
    pub announcer: Arc<Announcer>,
    pub player: Option<MpvIpc>,
}

impl Kiosk {
    /// Build the kiosk from configuration. Only the backend client can fail;
    /// every output degrades to its fallback instead.
    pub async fn build(config: &Config, no_audio: bool) -> Result<Self> {
        let backend: Arc<dyn MonitorBackend> = Arc::new(HttpBackend::new(&config.server)?);
        let output = Arc::new(LazyOutput::new(output_provider(config, no_audio)));
        let player = config
            .video
            .mpv_socket
            .as_ref()
            .map(|socket| MpvIpc::spawn(socket, config.video.max_volume));
        let ducking = DuckingController::new(
            player
                .clone()
                .map(|p| Arc::new(p) as Arc<dyn VideoVolume>),
        );
        let chime_url = resolve_chime_url(config, backend.as_ref()).await;

        let announcer = Announcer::from_config(
            config,
            Arc::clone(&backend),
            output,
            local_speech(config),
            ducking,
            chime_url,
        );

        Ok(Self {
            backend,
            announcer: Arc::new(announcer),
            player,
        })
    }

    /// Load the backend's video playlist into mpv.
    pub async fn start_videos(&self) {
        let Some(player) = &self.player else {
            return;
        };
        let urls: Vec<String> = match self.backend.fetch_videos().await {
            Ok(videos) => videos.into_iter().map(|v| v.url).collect(),
            Err(e) => {
                tracing::warn!("Failed to load videos: {}", e);
                return;
            }
        };
        if urls.is_empty() {
            tracing::info!("video playlist is empty");
            return;
        }
        match player.load_playlist(&urls).await {
            Ok(()) => tracing::info!(count = urls.len(), "video playlist loaded"),
            Err(e) => tracing::warn!("Failed to start video playlist: {}", e),
        }
    }

    /// Put the video back at full volume and wait until mpv has seen it.
    async fn restore_video(&self) {
        let Some(player) = &self.player else {
            return;
        };
        if let Err(e) = player.set_volume(defaults::FULL_VOLUME) {
            tracing::debug!("video volume restore failed: {}", e);
        }
        // mpv commands run in order, so this answer comes after the restore.
        if let Err(e) = player.ping().await {
            tracing::debug!("video player not answering: {}", e);
        }
    }
}

/// Sound card provider, or a null provider when audio is off.
pub fn output_provider(config: &Config, no_audio: bool) -> Arc<dyn OutputProvider> {
    if no_audio {
        return Arc::new(NullProvider::new("audio disabled (--no-audio)"));
    }
    if !config.audio.enabled {
        return Arc::new(NullProvider::new("audio disabled in configuration"));
    }
    sound_card(config)
}

#[cfg(feature = "cpal-audio")]
fn sound_card(config: &Config) -> Arc<dyn OutputProvider> {
    Arc::new(crate::audio::CpalProvider::new(
        config.audio.device.clone(),
        config.audio.volume,
    ))
}

#[cfg(not(feature = "cpal-audio"))]
fn sound_card(_config: &Config) -> Arc<dyn OutputProvider> {
    Arc::new(NullProvider::new("built without audio support"))
}

/// Local speech command, or nothing when disabled.
pub fn local_speech(config: &Config) -> Arc<dyn LocalSpeech> {
    if config.speech.local_enabled {
        Arc::new(CommandSpeech::from_config(&config.speech))
    } else {
        Arc::new(NullSpeech)
    }
}

/// Configured chime URL, else the backend's ding-sound setting.
///
/// Fetched once at startup; a failure leaves the synthesized chime.
pub async fn resolve_chime_url(config: &Config, backend: &dyn MonitorBackend) -> Option<String> {
    if let Some(url) = config.chime.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Some(url.to_string());
    }
    match backend.fetch_ding_sound_url().await {
        Ok(url) => url.filter(|u| !u.trim().is_empty()),
        Err(e) => {
            tracing::warn!("Failed to load chime setting, using synthesized chime: {}", e);
            None
        }
    }
}

/// Run the monitor until SIGINT or SIGTERM.
pub async fn run_monitor(config: Config, quiet: bool, no_audio: bool) -> Result<()> {
    let kiosk = Kiosk::build(&config, no_audio).await?;
    tracing::info!(
        version = %crate::version_string(),
        backend = %config.server.base_url,
        chime = kiosk.announcer.chime_url().unwrap_or("synthesized"),
        "starting monitor"
    );
    kiosk.start_videos().await;

    let controller = MonitorController::start(
        Arc::clone(&kiosk.backend),
        Arc::clone(&kiosk.announcer) as Arc<dyn Announce>,
        MonitorSettings::from(&config),
    );

    let board = (!quiet).then(|| {
        let mut display = controller.display();
        let terminal = std::io::stdout().is_terminal();
        tokio::spawn(async move {
            while display.changed().await.is_ok() {
                let board = render_board(&display.borrow_and_update(), terminal);
                print_board(&board, terminal);
            }
        })
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down");
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                tracing::error!("Error setting up signal handler: {}", e);
            }
            tracing::info!("Received SIGTERM, shutting down");
        }
    }

    if let Some(board) = board {
        board.abort();
    }
    controller.shutdown();
    kiosk.restore_video().await;
    Ok(())
}

fn print_board(board: &str, terminal: bool) {
    let mut stdout = std::io::stdout().lock();
    let cleared = if terminal {
        // Clear screen, cursor home.
        write!(stdout, "\x1b[2J\x1b[H")
    } else {
        Ok(())
    };
    if let Err(e) = cleared
        .and_then(|()| stdout.write_all(board.as_bytes()))
        .and_then(|()| stdout.flush())
    {
        tracing::debug!("board output failed: {}", e);
    }
}

/// Wait for SIGTERM (systemd stop).
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| MonitorError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

/// Fetch the windows once and print the board.
pub async fn run_windows(config: &Config) -> Result<()> {
    let backend = HttpBackend::new(&config.server)?;
    let windows = backend.fetch_windows().await?;
    print!("{}", render_board(&windows, std::io::stdout().is_terminal()));
    Ok(())
}

/// Play the chime once, ducking the video around it.
pub async fn run_chime(config: &Config, no_audio: bool) -> Result<()> {
    let kiosk = Kiosk::build(config, no_audio).await?;
    let outcome = kiosk.announcer.chime_only().await;
    kiosk.restore_video().await;
    println!("Chime: {:?}", outcome);
    Ok(())
}

/// Play a full announcement of `text`.
pub async fn run_say(config: &Config, no_audio: bool, text: &str) -> Result<()> {
    let kiosk = Kiosk::build(config, no_audio).await?;
    let item = AnnouncementItem {
        text: text.to_string(),
        key: AnnouncementKey::new("manual", text),
    };
    let report = kiosk.announcer.announce(&item).await;
    kiosk.restore_video().await;
    println!("Chime: {:?}, speech: {:?}", report.chime, report.speech);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[test]
    fn test_no_audio_never_opens_sound_card() {
        let provider = output_provider(&Config::default(), true);
        assert!(matches!(
            provider.open(),
            Err(MonitorError::AudioUnavailable { .. })
        ));
    }

    #[test]
    fn test_audio_disabled_in_config() {
        let mut config = Config::default();
        config.audio.enabled = false;
        let provider = output_provider(&config, false);
        assert!(provider.open().is_err());
    }

    #[cfg(feature = "cpal-audio")]
    #[test]
    fn test_sound_card_provider_leaves_environment_alone() {
        let before = std::env::var_os("JACK_NO_START_SERVER");
        let _provider = output_provider(&Config::default(), false);
        assert_eq!(std::env::var_os("JACK_NO_START_SERVER"), before);
    }

    #[test]
    fn test_local_speech_disabled() {
        let mut config = Config::default();
        config.speech.local_enabled = false;
        assert!(!local_speech(&config).is_available());
    }

    #[tokio::test]
    async fn test_chime_url_override_wins() {
        let mut config = Config::default();
        config.chime.url = Some("http://kiosk/ding.wav".to_string());
        let backend = MockBackend::new().with_ding_sound_url("/uploads/ding.mp3");

        assert_eq!(
            resolve_chime_url(&config, &backend).await.as_deref(),
            Some("http://kiosk/ding.wav")
        );
    }

    #[tokio::test]
    async fn test_chime_url_from_backend() {
        let mut config = Config::default();
        config.chime.url = Some("  ".to_string());
        let backend = MockBackend::new().with_ding_sound_url("/uploads/ding.mp3");

        assert_eq!(
            resolve_chime_url(&config, &backend).await.as_deref(),
            Some("/uploads/ding.mp3")
        );
        assert_eq!(resolve_chime_url(&config, &MockBackend::new()).await, None);
    }
}
