//! Beat hook: applies `goto-beat` commands to the display's navigation
//! state and reports the effective beat.
//!
//! Conflicting commands are ordered by `(ts, id)` of their envelopes. A
//! command whose key is not greater than the last applied one is stale: it
//! is dropped and the current beat is re-reported so the sender can see
//! what won.

use crate::navigation::navigator::resolve_beat_id;
use crate::protocol::command::{Command, decode_command};
use crate::protocol::envelope::OrderingKey;
use crate::protocol::topics::{GOTO_BEAT, Topics};
use crate::sync::state_access::StateAccess;
use crate::transport::client::{MessageClient, PublishOutcome};

use models::{GotoBeatBody, Meta, NavigationState, Sequence};

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeatOutcome {
    Applied(NavigationState),
    /// Older than the last applied command; carries the unchanged state.
    Stale(NavigationState),
    /// Unusable target or timestamp; carries the unchanged state.
    Rejected(NavigationState),
}

impl BeatOutcome {
    pub fn state(&self) -> &NavigationState {
        match self {
            BeatOutcome::Applied(state) | BeatOutcome::Stale(state) | BeatOutcome::Rejected(state) => {
                state
            }
        }
    }
}

pub struct BeatHook {
    exhibit: String,
    topics: Topics,
    sequence: Arc<Sequence>,
    state: Arc<dyn StateAccess<NavigationState>>,
    last_applied: Mutex<Option<OrderingKey>>,
}

impl BeatHook {
    pub fn new(
        exhibit: impl Into<String>,
        topics: Topics,
        sequence: Arc<Sequence>,
        state: Arc<dyn StateAccess<NavigationState>>,
    ) -> Self {
        Self {
            exhibit: exhibit.into(),
            topics,
            sequence,
            state,
            last_applied: Mutex::new(None),
        }
    }

    pub fn command_topic(&self) -> String {
        self.topics.command(&self.exhibit, GOTO_BEAT)
    }

    pub fn report_topic(&self) -> String {
        self.topics.state(&self.exhibit, GOTO_BEAT)
    }

    pub fn current(&self) -> NavigationState {
        self.state.get()
    }

    pub fn apply(&self, meta: &Meta, body: &GotoBeatBody) -> BeatOutcome {
        let key = match OrderingKey::from_meta(meta) {
            Ok(key) => key,
            Err(e) => {
                warn!("{}: goto-beat from {} has no usable timestamp: {e}", self.exhibit, meta.source);
                return BeatOutcome::Rejected(self.state.get());
            }
        };

        let mut last_applied = self
            .last_applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = last_applied.as_ref()
            && key <= *last
        {
            info!(
                "{}: stale goto-beat {} from {} ({} <= {})",
                self.exhibit,
                body.beat_id,
                meta.source,
                key.id(),
                last.id()
            );
            return BeatOutcome::Stale(self.state.get());
        }

        match resolve_beat_id(&self.sequence, &body.beat_id) {
            Ok(target) => {
                self.state.set(target.clone());
                *last_applied = Some(key);
                info!("{}: now at {} (from {})", self.exhibit, body.beat_id, meta.source);
                BeatOutcome::Applied(target)
            }
            Err(e) => {
                warn!("{}: cannot go to {}: {e}", self.exhibit, body.beat_id);
                BeatOutcome::Rejected(self.state.get())
            }
        }
    }

    /// Publish the effective beat (retained).
    pub fn report(&self, client: &MessageClient) -> PublishOutcome {
        let body = GotoBeatBody {
            beat_id: self.state.get().beat_id(),
        };
        client.publish_body(&self.report_topic(), body, true)
    }

    /// Handle one raw payload from the command topic.
    pub fn handle(&self, client: &MessageClient, payload: &str) -> Option<BeatOutcome> {
        match decode_command(GOTO_BEAT, payload) {
            Ok((meta, Command::GotoBeat(body))) => {
                let outcome = self.apply(&meta, &body);
                self.report(client);
                Some(outcome)
            }
            Ok((meta, Command::Empty { .. })) => {
                debug!("{}: goto-beat from {} has no beat id; ignoring", self.exhibit, meta.source);
                None
            }
            Ok((_, other)) => {
                warn!("{}: unexpected command on goto-beat topic: {other:?}", self.exhibit);
                None
            }
            Err(e) => {
                error!("{}: discarding malformed goto-beat: {e}", self.exhibit);
                None
            }
        }
    }
}
