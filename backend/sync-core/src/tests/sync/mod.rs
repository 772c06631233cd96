mod beat;
mod state_access;
mod volume;

use crate::sync::audio::AudioEngine;

use std::sync::Mutex;

/// Audio engine that records every call.
#[derive(Default)]
pub(crate) struct RecordingAudio {
    pub(crate) calls: Mutex<Vec<String>>,
}

impl AudioEngine for RecordingAudio {
    fn set_master_volume(&self, level: f64) {
        self.calls.lock().unwrap().push(format!("volume {level}"));
    }

    fn set_master_muted(&self, muted: bool) {
        self.calls.lock().unwrap().push(format!("muted {muted}"));
    }
}
