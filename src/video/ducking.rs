//! Background video volume control around announcements.

use crate::defaults;
use crate::error::{MonitorError, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// A video player whose volume can be set (0.0 = mute, 1.0 = full).
///
/// `set_volume` must not block; implementations queue the change.
pub trait VideoVolume: Send + Sync {
    fn set_volume(&self, volume: f32) -> Result<()>;
}

/// Lowers and restores the background video volume.
#[derive(Clone, Default)]
pub struct DuckingController {
    player: Option<Arc<dyn VideoVolume>>,
}

impl DuckingController {
    pub fn new(player: Option<Arc<dyn VideoVolume>>) -> Self {
        Self { player }
    }

    /// Controller with no video player; every call is a no-op.
    pub fn disabled() -> Self {
        Self { player: None }
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// Set the video volume, clamped to [0, 1] (NaN means full volume).
    pub fn duck(&self, volume: f32) {
        apply(self.player.as_deref(), clamp_volume(volume));
    }

    /// Duck to `volume` now and restore full volume when the guard drops.
    pub fn bracket(&self, volume: f32) -> DuckGuard {
        self.duck(volume);
        DuckGuard {
            player: self.player.clone(),
        }
    }
}

/// Restores full video volume on drop, whichever way the announcement ended.
pub struct DuckGuard {
    player: Option<Arc<dyn VideoVolume>>,
}

impl Drop for DuckGuard {
    fn drop(&mut self) {
        apply(self.player.as_deref(), defaults::FULL_VOLUME);
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        defaults::FULL_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn apply(player: Option<&dyn VideoVolume>, volume: f32) {
    if let Some(player) = player
        && let Err(e) = player.set_volume(volume)
    {
        tracing::debug!("Failed to set video volume to {}: {}", volume, e);
    }
}

/// Mock player recording every volume it was given.
#[derive(Default)]
pub struct RecordingVolume {
    volumes: Mutex<Vec<f32>>,
    fail: bool,
}

impl RecordingVolume {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records volumes but reports every call as failed.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.volumes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl VideoVolume for RecordingVolume {
    fn set_volume(&self, volume: f32) -> Result<()> {
        self.volumes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(volume);
        if self.fail {
            return Err(MonitorError::Video {
                message: "mock player gone".to_string(),
            });
        }
        Ok(())
    }
}
