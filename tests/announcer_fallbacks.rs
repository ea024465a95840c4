//! Announcer behavior under audio subsystem failures.
//!
//! Every combination must still complete in bounded time and restore the
//! background video volume.

use nowserving::announce::{Announce, Announcer, ChimeOutcome, MockSpeech, SpeechOutcome};
use nowserving::audio::{LazyOutput, MockOutput, MockOutputProvider, MockPlayback};
use nowserving::backend::{MockBackend, MockTts};
use nowserving::config::Config;
use nowserving::monitor::{AnnouncementItem, AnnouncementKey};
use nowserving::video::{DuckingController, RecordingVolume};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const DING: &str = "/uploads/ding.wav";

fn wav(duration_ms: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..duration_ms * 8 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn item() -> AnnouncementItem {
    AnnouncementItem {
        text: "Now serving number 7, please proceed to Window 1.".to_string(),
        key: AnnouncementKey::new("1", "012526-0007"),
    }
}

struct Setup {
    announcer: Announcer,
    player: Arc<RecordingVolume>,
    speech: Arc<MockSpeech>,
}

fn setup(
    backend: MockBackend,
    provider: MockOutputProvider,
    speech: MockSpeech,
    chime_url: Option<&str>,
) -> Setup {
    let player = Arc::new(RecordingVolume::new());
    let speech = Arc::new(speech);
    let announcer = Announcer::from_config(
        &Config::default(),
        Arc::new(backend),
        Arc::new(LazyOutput::new(Arc::new(provider))),
        speech.clone(),
        DuckingController::new(Some(player.clone())),
        chime_url.map(str::to_string),
    );
    Setup {
        announcer,
        player,
        speech,
    }
}

#[tokio::test(start_paused = true)]
async fn configured_chime_and_server_speech() {
    let output = Arc::new(MockOutput::new());
    let backend = MockBackend::new()
        .with_asset(DING, wav(500))
        .with_tts(MockTts::Audio(wav(1200)));
    let s = setup(
        backend,
        MockOutputProvider::new(output.clone()),
        MockSpeech::new(),
        Some(DING),
    );

    let report = s.announcer.announce(&item()).await;

    assert_eq!(report.chime, ChimeOutcome::Primary);
    assert_eq!(report.speech, SpeechOutcome::Server);
    assert!(s.speech.spoken().is_empty());
    assert_eq!(output.max_concurrent(), 1);
    assert_eq!(s.player.volumes(), vec![0.5, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn missing_chime_asset_and_failing_tts_fall_back() {
    let output = Arc::new(MockOutput::new());
    let backend = MockBackend::new().with_tts(MockTts::Fail);
    let s = setup(
        backend,
        MockOutputProvider::new(output),
        MockSpeech::new(),
        Some(DING),
    );

    let report = s.announcer.announce(&item()).await;

    assert_eq!(report.chime, ChimeOutcome::Synthesized);
    assert_eq!(report.speech, SpeechOutcome::Local);
    assert_eq!(s.speech.spoken(), vec![item().text]);
    assert_eq!(s.player.volumes(), vec![0.5, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn hanging_chime_is_abandoned_within_bound() {
    // The configured chime never progresses; the synthesized one plays normally.
    let output = Arc::new(MockOutput::new().with_script(&[MockPlayback::Hang]));
    let backend = MockBackend::new().with_asset(DING, wav(500));
    let s = setup(
        backend,
        MockOutputProvider::new(output),
        MockSpeech::new().with_duration(Duration::ZERO),
        Some(DING),
    );

    let started = Instant::now();
    let report = s.announcer.announce(&item()).await;

    assert_eq!(report.chime, ChimeOutcome::Synthesized);
    assert!(started.elapsed() <= Duration::from_secs(7));
    assert_eq!(s.player.volumes(), vec![0.5, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn failing_device_completes_in_bounded_time() {
    let output = Arc::new(MockOutput::new().with_default(MockPlayback::Fail));
    let backend = MockBackend::new()
        .with_asset(DING, wav(500))
        .with_tts(MockTts::Audio(wav(800)));
    let s = setup(
        backend,
        MockOutputProvider::new(output),
        MockSpeech::unavailable(),
        Some(DING),
    );

    let started = Instant::now();
    let report = s.announcer.announce(&item()).await;

    assert_ne!(report.chime, ChimeOutcome::Primary);
    // Server audio started, so the phase resolves as server speech even though it failed.
    assert_eq!(report.speech, SpeechOutcome::Server);
    assert!(started.elapsed() <= Duration::from_secs(10));
    assert_eq!(s.player.volumes(), vec![0.5, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn no_sound_card_and_no_local_speech_is_silent() {
    let s = setup(
        MockBackend::new().with_tts(MockTts::Audio(wav(800))),
        MockOutputProvider::failing(),
        MockSpeech::unavailable(),
        Some(DING),
    );

    let started = Instant::now();
    let report = s.announcer.announce(&item()).await;

    assert_eq!(report.chime, ChimeOutcome::Silent);
    assert_eq!(report.speech, SpeechOutcome::Silent);
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(s.player.volumes(), vec![0.5, 1.0]);
}

#[tokio::test(start_paused = true)]
async fn html_tts_answer_uses_local_speech() {
    let s = setup(
        MockBackend::new().with_tts(MockTts::Html),
        MockOutputProvider::new(Arc::new(MockOutput::new())),
        MockSpeech::new(),
        None,
    );

    let report = s.announcer.announce(&item()).await;

    assert_eq!(report.chime, ChimeOutcome::Synthesized);
    assert_eq!(report.speech, SpeechOutcome::Local);
}
