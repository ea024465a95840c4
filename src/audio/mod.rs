//! Audio decoding, synthesis, and playback.

pub mod clip;
pub mod output;
#[cfg(feature = "cpal-audio")]
pub mod playback;
pub mod tone;

pub use clip::AudioClip;
pub use output::{
    AudioOutput, LazyOutput, MockOutput, MockOutputProvider, MockPlayback, NullProvider,
    OutputProvider, Playback, PlaybackControls, PlaybackEnd, PlaybackReport,
};
#[cfg(feature = "cpal-audio")]
pub use playback::{CpalOutput, CpalProvider, list_output_devices, suppress_audio_warnings};
pub use tone::ChimeTone;
