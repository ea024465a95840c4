//! Kiosk diagnostics.
//!
//! Verifies that the backend answers and that every output the announcer can
//! fall back to (sound card, local speech, video player) is reachable.

use crate::backend::MonitorBackend;
use crate::config::Config;
use crate::defaults;
use crate::video::MpvIpc;

/// Result of a single check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Working
    Ok,
    /// Not present or not configured
    NotFound,
    /// Present but has issues
    Warning(String),
}

/// Backend window endpoint.
pub async fn check_windows(backend: &dyn MonitorBackend) -> CheckResult {
    match backend.fetch_windows().await {
        Ok(_) => CheckResult::Ok,
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

/// Chime source: a configured override, else the backend setting.
///
/// `NotFound` means announcements will use the synthesized chime.
pub async fn check_chime_source(backend: &dyn MonitorBackend, config: &Config) -> CheckResult {
    if config.chime.url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
        return CheckResult::Ok;
    }
    match backend.fetch_ding_sound_url().await {
        Ok(Some(url)) if !url.trim().is_empty() => CheckResult::Ok,
        Ok(_) => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

/// Video playlist endpoint.
pub async fn check_videos(backend: &dyn MonitorBackend) -> CheckResult {
    match backend.fetch_videos().await {
        Ok(videos) if videos.is_empty() => CheckResult::NotFound,
        Ok(_) => CheckResult::Ok,
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

/// Sound card used for chime and server speech.
pub fn check_audio_output(config: &Config, no_audio: bool) -> CheckResult {
    if no_audio || !config.audio.enabled {
        return CheckResult::Warning("disabled by configuration".to_string());
    }
    check_audio_devices(config.audio.device.as_deref())
}

#[cfg(feature = "cpal-audio")]
fn check_audio_devices(wanted: Option<&str>) -> CheckResult {
    match crate::audio::list_output_devices() {
        Ok(devices) if devices.is_empty() => CheckResult::NotFound,
        Ok(devices) => match wanted {
            Some(name) if !devices.iter().any(|d| d.starts_with(name)) => {
                CheckResult::Warning(format!("configured device '{}' not found", name))
            }
            _ => CheckResult::Ok,
        },
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

#[cfg(not(feature = "cpal-audio"))]
fn check_audio_devices(_wanted: Option<&str>) -> CheckResult {
    CheckResult::Warning("built without audio support".to_string())
}

/// On-device speech command.
pub fn check_local_speech(config: &Config) -> CheckResult {
    if !config.speech.local_enabled {
        return CheckResult::Warning("disabled by configuration".to_string());
    }
    match which::which(&config.speech.local_command) {
        Ok(_) => CheckResult::Ok,
        Err(_) => CheckResult::NotFound,
    }
}

/// mpv answering on its IPC socket.
pub async fn check_video_player(config: &Config) -> CheckResult {
    let Some(socket) = &config.video.mpv_socket else {
        return CheckResult::NotFound;
    };
    match MpvIpc::spawn(socket, config.video.max_volume).ping().await {
        Ok(()) => CheckResult::Ok,
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

fn print_result(label: &str, result: &CheckResult, not_found: &str) {
    match result {
        CheckResult::Ok => println!("{}: ✓ OK", label),
        CheckResult::NotFound => println!("{}: - {}", label, not_found),
        CheckResult::Warning(msg) => println!("{}: ⚠ WARNING: {}", label, msg),
    }
}

/// Run all checks and print results. Returns whether the backend is reachable
/// and at least one way of announcing works.
pub async fn check_dependencies(
    backend: &dyn MonitorBackend,
    config: &Config,
    no_audio: bool,
) -> bool {
    println!("Checking kiosk setup...\n");
    println!("Backend: {}", config.server.base_url);

    let windows = check_windows(backend).await;
    print_result("  Windows", &windows, "no answer");
    print_result(
        "  Chime",
        &check_chime_source(backend, config).await,
        "not configured (synthesized chime)",
    );
    print_result("  Videos", &check_videos(backend).await, "empty playlist");

    println!();
    println!("Outputs (audio backend: {}):", defaults::audio_backend());
    let audio = check_audio_output(config, no_audio);
    print_result("  Sound card", &audio, "no output device");
    let speech = check_local_speech(config);
    print_result(
        "  Local speech",
        &speech,
        &format!("'{}' not installed", config.speech.local_command),
    );
    if speech == CheckResult::NotFound {
        println!("    Install: sudo apt install speech-dispatcher  (Debian/Ubuntu)");
    }
    print_result(
        "  Video player",
        &check_video_player(config).await,
        "no mpv socket configured",
    );

    println!();
    let backend_ok = windows == CheckResult::Ok;
    let can_announce = audio == CheckResult::Ok || speech == CheckResult::Ok;
    if !backend_ok {
        println!("⚠ Backend unreachable: the board will stay empty.");
    }
    if !can_announce {
        println!("⚠ No working sound card or local speech: announcements will be silent.");
    }
    if backend_ok && can_announce {
        println!("✓ Ready to announce.");
    }
    backend_ok && can_announce
}
