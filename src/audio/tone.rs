//! Synthesized two-tone chime.
//!
//! Two sine tones, the second starting slightly later, each shaped by a short
//! linear attack and an exponential release. Used whenever the configured chime
//! sound cannot be played.

use crate::audio::clip::AudioClip;
use crate::defaults;
use std::f32::consts::TAU;
use std::time::Duration;

/// Level the exponential release decays to (the ramp cannot reach zero).
const RELEASE_FLOOR: f32 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct ChimeTone {
    pub frequencies: [f32; 2],
    pub stagger: Duration,
    pub attack: Duration,
    pub release: Duration,
    pub peak_gain: f32,
}

impl Default for ChimeTone {
    fn default() -> Self {
        Self {
            frequencies: defaults::CHIME_TONES_HZ,
            stagger: Duration::from_millis(defaults::CHIME_STAGGER_MS),
            attack: Duration::from_millis(defaults::CHIME_ATTACK_MS),
            release: Duration::from_millis(defaults::CHIME_RELEASE_MS),
            peak_gain: defaults::CHIME_PEAK_GAIN,
        }
    }
}

impl ChimeTone {
    /// Length of one tone.
    pub fn tone_length(&self) -> Duration {
        self.attack + self.release
    }

    /// Length of the whole chime.
    pub fn total_length(&self) -> Duration {
        self.stagger + self.tone_length()
    }

    /// Render the chime at `sample_rate`.
    pub fn render(&self, sample_rate: u32) -> AudioClip {
        let rate = sample_rate.max(1) as f32;
        let total = samples_for(self.total_length(), rate);
        let offset = samples_for(self.stagger, rate);
        let tone_length = self.tone_length().as_secs_f32();
        let mut samples = vec![0.0f32; total];

        for (index, &frequency) in self.frequencies.iter().enumerate() {
            let start = offset * index;
            for (n, sample) in samples.iter_mut().skip(start).enumerate() {
                let t = n as f32 / rate;
                if t >= tone_length {
                    break;
                }
                *sample += self.envelope(t) * (TAU * frequency * t).sin();
            }
        }

        AudioClip::new(samples, sample_rate)
    }

    /// Gain `t` seconds after a tone starts.
    fn envelope(&self, t: f32) -> f32 {
        let attack = self.attack.as_secs_f32();
        let release = self.release.as_secs_f32();

        if t < 0.0 {
            0.0
        } else if t < attack {
            self.peak_gain * t / attack
        } else if t < attack + release {
            // Exponential ramp from peak down to the floor over the release.
            let progress = (t - attack) / release;
            let floor_ratio = (RELEASE_FLOOR / self.peak_gain).max(f32::MIN_POSITIVE);
            self.peak_gain * floor_ratio.powf(progress)
        } else {
            0.0
        }
    }
}

fn samples_for(duration: Duration, rate: f32) -> usize {
    (duration.as_secs_f32() * rate).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chime_length() {
        let tone = ChimeTone::default();
        assert_eq!(tone.tone_length(), Duration::from_millis(400));
        assert_eq!(tone.total_length(), Duration::from_millis(480));

        let clip = tone.render(48_000);
        assert_eq!(clip.samples().len(), 48_000 * 480 / 1000);
        assert_eq!(clip.sample_rate(), 48_000);
    }

    #[test]
    fn test_chime_stays_within_range() {
        let clip = ChimeTone::default().render(44_100);
        let peak = clip.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()));

        assert!(peak > 0.1, "chime should be audible, peak {peak}");
        assert!(peak <= 1.0, "chime must not clip, peak {peak}");
    }

    #[test]
    fn test_chime_starts_silent() {
        let clip = ChimeTone::default().render(16_000);
        assert_eq!(clip.samples()[0], 0.0);
    }

    #[test]
    fn test_envelope_shape() {
        let tone = ChimeTone::default();

        assert_eq!(tone.envelope(0.0), 0.0);
        assert!((tone.envelope(0.015) - tone.peak_gain / 2.0).abs() < 1e-4);
        assert!((tone.envelope(0.030) - tone.peak_gain).abs() < 1e-4);
        assert!(tone.envelope(0.2) < tone.peak_gain);
        assert!(tone.envelope(0.399) < 0.002);
        assert_eq!(tone.envelope(0.5), 0.0);
    }

    #[test]
    fn test_second_tone_is_staggered() {
        let tone = ChimeTone {
            frequencies: [0.0, 1000.0],
            ..ChimeTone::default()
        };
        let clip = tone.render(10_000);

        // First tone is silent (0 Hz), so nothing before the 80 ms offset.
        assert!(clip.samples()[..800].iter().all(|s| s.abs() < 1e-6));
        assert!(clip.samples()[800..1200].iter().any(|s| s.abs() > 0.01));
    }
}
