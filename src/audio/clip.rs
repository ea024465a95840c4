//! Decoded mono audio clips.
//!
//! Chime sounds and server TTS answers arrive as encoded bytes. WAV goes through
//! `hound`; everything else (MP3, Ogg/Vorbis) through `symphonia`. Either way the
//! result is a mono `f32` clip at its native sample rate, resampled on playback.

use crate::error::{MonitorError, Result};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono PCM clip, samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Cheap handle to the sample buffer for the audio thread.
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        duration_of(self.samples.len(), self.sample_rate)
    }

    /// Same clip at another sample rate.
    pub fn resampled(&self, sample_rate: u32) -> AudioClip {
        if sample_rate == self.sample_rate {
            return self.clone();
        }
        AudioClip::new(resample(&self.samples, self.sample_rate, sample_rate), sample_rate)
    }

    /// Decode encoded audio bytes; `content_type` is used as a format hint.
    pub fn decode(bytes: &[u8], content_type: Option<&str>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(MonitorError::AudioDecode {
                message: "empty audio payload".to_string(),
            });
        }

        let clip = if bytes.starts_with(b"RIFF") {
            Self::from_wav(bytes)?
        } else {
            Self::from_compressed(bytes, content_type)?
        };

        if clip.is_empty() {
            return Err(MonitorError::AudioDecode {
                message: "audio payload contains no samples".to_string(),
            });
        }
        Ok(clip)
    }

    fn from_wav(bytes: &[u8]) -> Result<Self> {
        let reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| MonitorError::AudioDecode {
                message: format!("Failed to parse WAV data: {}", e),
            })?;

        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(|e| MonitorError::AudioDecode {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        Ok(AudioClip::new(
            mix_to_mono(&interleaved, spec.channels as usize),
            spec.sample_rate,
        ))
    }

    fn from_compressed(bytes: &[u8], content_type: Option<&str>) -> Result<Self> {
        let mut hint = Hint::new();
        if let Some(mime) = content_type {
            hint.mime_type(mime.split(';').next().unwrap_or(mime).trim());
        }

        let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| MonitorError::AudioDecode {
                message: format!("Unrecognized audio format: {}", e),
            })?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| MonitorError::AudioDecode {
                message: "no decodable audio track".to_string(),
            })?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| MonitorError::AudioDecode {
                message: format!("Unsupported codec: {}", e),
            })?;

        let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
        let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(1);
        let mut interleaved = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                // End of stream (or a chained stream we do not follow)
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(MonitorError::AudioDecode {
                        message: format!("Failed to read packet: {}", e),
                    });
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buffer.samples());
                }
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => {
                    return Err(MonitorError::AudioDecode {
                        message: format!("Failed to decode packet: {}", e),
                    });
                }
            }
        }

        if sample_rate == 0 {
            return Err(MonitorError::AudioDecode {
                message: "unknown sample rate".to_string(),
            });
        }

        Ok(AudioClip::new(mix_to_mono(&interleaved, channels), sample_rate))
    }
}

/// Playback time of `samples` mono samples at `sample_rate`.
pub fn duration_of(samples: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(samples as f64 / sample_rate.max(1) as f64)
}

/// Average interleaved channels into one.
fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}
