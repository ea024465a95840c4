//! Default configuration constants for nowserving.
//!
//! Shared by the config layer and the components that fall back to them, so the
//! tuning numbers live in one place.

/// Default backend base URL (the API prefix the kiosk frontend talks to).
pub const BASE_URL: &str = "http://localhost:3000/api";

/// Default HTTP request timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Interval between two polls of `GET /queue/public/windows`.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Span during which a repeated announcement key is suppressed.
///
/// Empirical: long enough to swallow duplicate transitions reported by jittery
/// polling, short enough that a genuinely re-called number is announced again.
pub const COLLISION_WINDOW_MS: u64 = 8_000;

/// Default announcement template.
///
/// Placeholders: `{window}`, `{counter}`, `{client}` (", <name>" or empty).
pub const ANNOUNCEMENT_TEMPLATE: &str =
    "Now serving number {counter}{client}, please proceed to {window}.";

/// Time allowed for the configured chime to show playback progress.
pub const CHIME_CONFIRM_TIMEOUT_MS: u64 = 2_000;

/// Absolute bound on the chime phase.
pub const CHIME_PHASE_TIMEOUT_MS: u64 = 7_000;

/// A chime counts as played once it has advanced this far...
pub const CHIME_MIN_PROGRESS_MS: u64 = 100;

/// ...or this fraction of its duration, whichever is smaller.
pub const CHIME_MIN_PROGRESS_FRACTION: f32 = 0.1;

/// Frequencies of the synthesized two-tone chime in Hz.
pub const CHIME_TONES_HZ: [f32; 2] = [880.0, 1175.0];

/// Delay of the second chime tone relative to the first.
pub const CHIME_STAGGER_MS: u64 = 80;

/// Attack ramp of each chime tone.
pub const CHIME_ATTACK_MS: u64 = 30;

/// Release ramp of each chime tone.
pub const CHIME_RELEASE_MS: u64 = 370;

/// Peak amplitude of a single chime tone (two overlap, so keep headroom).
pub const CHIME_PEAK_GAIN: f32 = 0.25;

/// Absolute bound on the speech phase.
pub const SPEECH_TIMEOUT_MS: u64 = 30_000;

/// Grace period added to a clip's length before its playback is considered stuck.
pub const PLAYBACK_GRACE_MS: u64 = 2_000;

/// Default on-device speech command (speech-dispatcher).
pub const LOCAL_SPEECH_COMMAND: &str = "spd-say";

/// Arguments passed before the text; `--wait` blocks until speech ends.
pub const LOCAL_SPEECH_ARGS: &[&str] = &["--wait"];

/// Video volume while an announcement plays (fraction of full volume).
pub const DUCK_VOLUME: f32 = 0.5;

/// Video volume restored after an announcement.
pub const FULL_VOLUME: f32 = 1.0;

/// mpv volume corresponding to full volume.
pub const MPV_MAX_VOLUME: u32 = 100;

/// Name of the systemd user unit installed by `install-service`.
pub const SERVICE_NAME: &str = "nowserving.service";

/// Report the audio backend compiled into this build.
pub fn audio_backend() -> &'static str {
    if cfg!(feature = "cpal-audio") {
        "cpal"
    } else {
        "none"
    }
}
