//! Background video player control.

pub mod ducking;
pub mod mpv;

pub use ducking::{DuckGuard, DuckingController, RecordingVolume, VideoVolume};
pub use mpv::MpvIpc;
