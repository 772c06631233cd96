//! Audio capability consumed by the volume hook.

use log::info;

/// The audio engine the volume hook drives. Clamping and mixing are the
/// engine's business.
pub trait AudioEngine: Send + Sync {
    fn set_master_volume(&self, level: f64);

    fn set_master_muted(&self, muted: bool);
}

/// Engine for surfaces without audio output; logs what it would do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAudioEngine;

impl AudioEngine for LoggingAudioEngine {
    fn set_master_volume(&self, level: f64) {
        info!("Master volume -> {level}");
    }

    fn set_master_muted(&self, muted: bool) {
        info!("Master muted -> {muted}");
    }
}
