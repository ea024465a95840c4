//! Sound card output using CPAL (Cross-Platform Audio Library).
//!
//! One output stream is opened per session and kept running; clips are mixed
//! into it as voices. The stream callback reports each voice's position and
//! delivers its end event, which is what the announcer's phases wait on.

use crate::audio::clip::{AudioClip, duration_of};
use crate::audio::output::{AudioOutput, OutputProvider, Playback, PlaybackControls, PlaybackEnd};
use crate::error::{MonitorError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex, PoisonError};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
///
/// # Safety
/// Modifies the process environment. The caller must ensure no other thread
/// exists yet, so call it from `main` before the async runtime is built.
pub unsafe fn suppress_audio_warnings() {
    // SAFETY: single-threaded per the caller's contract
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Sound servers preferred over raw hardware devices.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

#[allow(deprecated)]
fn device_name(device: &cpal::Device) -> Option<String> {
    device.name().ok()
}

/// List output device names, sound servers marked "\[recommended\]".
pub fn list_output_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| cpal::default_host().output_devices());
    let devices = devices.map_err(|e| MonitorError::AudioUnavailable {
        message: format!("Failed to enumerate output devices: {}", e),
    })?;

    Ok(devices
        .filter_map(|d| device_name(&d))
        .map(|name| {
            if is_preferred_device(&name) {
                format!("{} [recommended]", name)
            } else {
                name
            }
        })
        .collect())
}

/// Find the named device, or the best default (PipeWire, PulseAudio, system default).
fn find_output_device(device_name_wanted: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Some(wanted) = device_name_wanted {
            let devices = host
                .output_devices()
                .map_err(|e| MonitorError::AudioUnavailable {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;
            for device in devices {
                if device_name(&device).as_deref() == Some(wanted) {
                    return Ok(device);
                }
            }
            return Err(MonitorError::AudioUnavailable {
                message: format!("output device not found: {}", wanted),
            });
        }

        if let Ok(devices) = host.output_devices() {
            for device in devices {
                if device_name(&device).is_some_and(|n| is_preferred_device(&n)) {
                    return Ok(device);
                }
            }
        }

        host.default_output_device()
            .ok_or_else(|| MonitorError::AudioUnavailable {
                message: "no default output device".to_string(),
            })
    })
}

/// A clip being mixed into the stream.
struct Voice {
    samples: Arc<[f32]>,
    cursor: usize,
    sample_rate: u32,
    controls: PlaybackControls,
}

/// State shared between the stream callback and `play`.
struct Mixer {
    voices: Vec<Voice>,
    volume: f32,
    failed: Option<String>,
}

impl Mixer {
    /// Fill one interleaved output buffer and retire finished voices.
    fn render(&mut self, out: &mut [f32], channels: usize) {
        self.retire(|voice| voice.controls.is_stopped(), || {
            PlaybackEnd::Failed("stopped".to_string())
        });

        for frame in out.chunks_mut(channels.max(1)) {
            let mut sum = 0.0f32;
            for voice in self.voices.iter_mut() {
                if let Some(sample) = voice.samples.get(voice.cursor) {
                    sum += sample;
                    voice.cursor += 1;
                }
            }
            frame.fill((sum * self.volume).clamp(-1.0, 1.0));
        }

        for voice in &self.voices {
            voice
                .controls
                .report_progress(duration_of(voice.cursor, voice.sample_rate));
        }
        self.retire(|voice| voice.cursor >= voice.samples.len(), || PlaybackEnd::Finished);
    }

    fn retire(&mut self, done: impl Fn(&Voice) -> bool, end: impl Fn() -> PlaybackEnd) {
        let mut i = 0;
        while i < self.voices.len() {
            if done(&self.voices[i]) {
                let voice = self.voices.swap_remove(i);
                voice.controls.finish(end());
            } else {
                i += 1;
            }
        }
    }

    fn fail(&mut self, message: String) {
        for voice in self.voices.drain(..) {
            voice.controls.finish(PlaybackEnd::Failed(message.clone()));
        }
        self.failed = Some(message);
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only touched at construction and drop, both behind the
/// Mutex in CpalOutput; the audio callback never reaches it.
struct SendableStream(#[allow(dead_code)] cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real audio output implementation using CPAL.
pub struct CpalOutput {
    _stream: Mutex<SendableStream>,
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: u32,
}

impl CpalOutput {
    /// Open the output device and start an (initially silent) stream.
    ///
    /// # Errors
    /// Returns `MonitorError::AudioUnavailable` if the device is missing, its
    /// format is unsupported, or the stream cannot be started.
    pub fn open(device_name: Option<&str>, volume: f32) -> Result<Self> {
        let device = find_output_device(device_name)?;
        let supported = device
            .default_output_config()
            .map_err(|e| MonitorError::AudioUnavailable {
                message: format!("Failed to query default output config: {}", e),
            })?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;
        let sample_rate = config.sample_rate;

        let mixer = Arc::new(Mutex::new(Mixer {
            voices: Vec::new(),
            volume: volume.clamp(0.0, 1.0),
            failed: None,
        }));

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                let render_mixer = Arc::clone(&mixer);
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        render_mixer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .render(data, channels);
                    },
                    error_callback(Arc::clone(&mixer)),
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let render_mixer = Arc::clone(&mixer);
                let mut scratch: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0.0);
                        render_mixer
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .render(&mut scratch, channels);
                        for (out, sample) in data.iter_mut().zip(&scratch) {
                            *out = (sample * i16::MAX as f32) as i16;
                        }
                    },
                    error_callback(Arc::clone(&mixer)),
                    None,
                )
            }
            fmt => {
                return Err(MonitorError::AudioUnavailable {
                    message: format!(
                        "Unsupported output sample format: {:?}. \
                         Try another device with audio.device.",
                        fmt
                    ),
                });
            }
        }
        .map_err(|e| MonitorError::AudioUnavailable {
            message: format!("Failed to build output stream: {}", e),
        })?;

        stream.play().map_err(|e| MonitorError::AudioUnavailable {
            message: format!("Failed to start output stream: {}", e),
        })?;

        tracing::debug!(channels, sample_rate, ?sample_format, "audio output opened");

        Ok(Self {
            _stream: Mutex::new(SendableStream(stream)),
            mixer,
            sample_rate,
        })
    }
}

fn error_callback(mixer: Arc<Mutex<Mixer>>) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        tracing::warn!("Audio stream error: {}", err);
        mixer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail(err.to_string());
    }
}

impl AudioOutput for CpalOutput {
    fn play(&self, clip: &AudioClip) -> Result<Playback> {
        let mut mixer = self.mixer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(message) = &mixer.failed {
            return Err(MonitorError::AudioPlayback {
                message: message.clone(),
            });
        }

        let clip = clip.resampled(self.sample_rate);
        let (playback, controls) = Playback::channel(clip.duration());
        mixer.voices.push(Voice {
            samples: clip.shared_samples(),
            cursor: 0,
            sample_rate: clip.sample_rate(),
            controls,
        });
        Ok(playback)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_healthy(&self) -> bool {
        self.mixer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .failed
            .is_none()
    }
}

/// Opens a [`CpalOutput`] on demand.
#[derive(Debug, Clone)]
pub struct CpalProvider {
    device: Option<String>,
    volume: f32,
}

impl CpalProvider {
    pub fn new(device: Option<String>, volume: f32) -> Self {
        Self { device, volume }
    }
}

impl OutputProvider for CpalProvider {
    fn open(&self) -> Result<Arc<dyn AudioOutput>> {
        let output = CpalOutput::open(self.device.as_deref(), self.volume)?;
        Ok(Arc::new(output))
    }
}
