//! Volume hook: applies `set-volume` commands and reports the merged state.

use crate::protocol::command::{Command, decode_command};
use crate::protocol::topics::{SET_VOLUME, Topics};
use crate::sync::audio::AudioEngine;
use crate::sync::state_access::StateAccess;
use crate::transport::client::{MessageClient, PublishOutcome};

use models::{SetVolumeBody, VolumeState};

use std::sync::Arc;

use log::{debug, error, info, warn};

pub struct VolumeHook {
    exhibit: String,
    topics: Topics,
    state: Arc<dyn StateAccess<VolumeState>>,
    audio: Arc<dyn AudioEngine>,
}

impl VolumeHook {
    pub fn new(
        exhibit: impl Into<String>,
        topics: Topics,
        state: Arc<dyn StateAccess<VolumeState>>,
        audio: Arc<dyn AudioEngine>,
    ) -> Self {
        Self {
            exhibit: exhibit.into(),
            topics,
            state,
            audio,
        }
    }

    pub fn command_topic(&self) -> String {
        self.topics.command(&self.exhibit, SET_VOLUME)
    }

    pub fn report_topic(&self) -> String {
        self.topics.state(&self.exhibit, SET_VOLUME)
    }

    pub fn current(&self) -> VolumeState {
        self.state.get()
    }

    /// Merge the fields present in `update` and drive the audio engine for
    /// each of them. Returns the effective state.
    pub fn apply(&self, update: &SetVolumeBody) -> VolumeState {
        let merged = self.state.update(&|current| current.merge(update));

        if let Some(level) = update.level {
            self.audio.set_master_volume(level);
        }
        if let Some(muted) = update.muted {
            self.audio.set_master_muted(muted);
        }

        merged
    }

    /// Publish the full effective state (retained).
    pub fn report(&self, client: &MessageClient) -> PublishOutcome {
        client.publish_body(&self.report_topic(), self.state.get().to_report(), true)
    }

    /// Handle one raw payload from the command topic.
    pub fn handle(&self, client: &MessageClient, payload: &str) -> Option<VolumeState> {
        match decode_command(SET_VOLUME, payload) {
            Ok((meta, Command::SetVolume(update))) => {
                let merged = self.apply(&update);
                info!(
                    "{}: volume {} muted {} (from {})",
                    self.exhibit, merged.level, merged.muted, meta.source
                );
                self.report(client);
                Some(merged)
            }
            Ok((meta, Command::Empty { .. })) => {
                debug!("{}: set-volume from {} has no fields; ignoring", self.exhibit, meta.source);
                None
            }
            Ok((_, other)) => {
                warn!("{}: unexpected command on set-volume topic: {other:?}", self.exhibit);
                None
            }
            Err(e) => {
                error!("{}: discarding malformed set-volume: {e}", self.exhibit);
                None
            }
        }
    }
}
