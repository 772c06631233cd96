//! Navigation driven from a controlling device.
//!
//! [`NavigationController`] wraps a [`Navigator`] and couples every
//! successful local transition to a `goto-beat` publish on each target
//! exhibit's command topic. It also listens to the targets' `goto-beat`
//! state reports: the first report seeds the position if nothing has moved
//! locally yet; after that, reports only confirm and local intent wins.

use crate::error::navigation::NavigationError;
use crate::navigation::navigator::{Navigator, Transition};
use crate::protocol::command::{Command, decode_command};
use crate::protocol::topics::{GOTO_BEAT, SET_VOLUME, Topics};
use crate::transport::client::{MessageClient, PublishOutcome, SubscriptionId};

use models::{GotoBeatBody, NavigationState, Sequence, SetVolumeBody};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

struct ControllerState {
    navigator: Navigator,
    seeded: bool,
    confirmed: HashMap<String, String>,
}

impl ControllerState {
    fn apply_report(&mut self, exhibit: &str, payload: &str) {
        let beat_id = match decode_command(GOTO_BEAT, payload) {
            Ok((_, Command::GotoBeat(GotoBeatBody { beat_id }))) => beat_id,
            Ok((_, other)) => {
                debug!("Ignoring {exhibit} report without a beat id: {other:?}");
                return;
            }
            Err(e) => {
                warn!("Discarding malformed report from {exhibit}: {e}");
                return;
            }
        };

        self.confirmed.insert(exhibit.to_string(), beat_id.clone());

        if !self.seeded {
            match self.navigator.goto_beat_id(&beat_id) {
                Ok(_) => {
                    self.seeded = true;
                    info!("Seeded navigation at {beat_id} from {exhibit}");
                }
                Err(e) => warn!("{exhibit} reported a beat we cannot seed from: {e}"),
            }
            return;
        }

        let local = self.navigator.current_beat_id();
        if beat_id != local {
            info!("{exhibit} reports {beat_id} while local intent is {local}; keeping local");
        }
    }
}

fn lock(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct NavigationController {
    client: MessageClient,
    topics: Topics,
    targets: Vec<String>,
    state: Arc<Mutex<ControllerState>>,
    subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
}

impl NavigationController {
    /// # Errors
    ///
    /// Returns [`NavigationError::EmptySequence`] for a sequence without beats.
    pub fn new(
        client: MessageClient,
        topics: Topics,
        targets: Vec<String>,
        sequence: Arc<Sequence>,
    ) -> Result<Self, NavigationError> {
        let navigator = Navigator::new(sequence)?;
        Ok(Self {
            client,
            topics,
            targets,
            state: Arc::new(Mutex::new(ControllerState {
                navigator,
                seeded: false,
                confirmed: HashMap::new(),
            })),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to every target's `goto-beat` report. Idempotent.
    pub fn attach(&self) {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !subscriptions.is_empty() {
            return;
        }

        for exhibit in &self.targets {
            let topic = self.topics.state(exhibit, GOTO_BEAT);
            let state = Arc::clone(&self.state);
            let source = exhibit.clone();
            let id = self.client.subscribe_to_topic(topic.clone(), move |message| {
                lock(&state).apply_report(&source, message.payload);
            });
            subscriptions.push((topic, id));
        }
    }

    pub fn detach(&self) {
        let subscriptions = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for (topic, id) in subscriptions {
            self.client.unsubscribe_from_topic(&topic, id);
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn state(&self) -> NavigationState {
        lock(&self.state).navigator.state().clone()
    }

    pub fn current_beat_id(&self) -> String {
        lock(&self.state).navigator.current_beat_id()
    }

    pub fn progress(&self) -> (usize, usize) {
        lock(&self.state).navigator.progress()
    }

    pub fn is_next_disabled(&self) -> bool {
        lock(&self.state).navigator.is_next_disabled()
    }

    pub fn is_previous_disabled(&self) -> bool {
        lock(&self.state).navigator.is_previous_disabled()
    }

    /// Last beat id `exhibit` reported, if any.
    pub fn confirmed_beat(&self, exhibit: &str) -> Option<String> {
        lock(&self.state).confirmed.get(exhibit).cloned()
    }

    /// True when every target has reported the current local beat.
    pub fn is_synchronized(&self) -> bool {
        let state = lock(&self.state);
        let local = state.navigator.current_beat_id();
        self.targets
            .iter()
            .all(|exhibit| state.confirmed.get(exhibit) == Some(&local))
    }

    pub fn next(&self) -> Transition {
        self.local(|navigator| Ok(navigator.next()))
            .unwrap_or(Transition::Disabled)
    }

    pub fn previous(&self) -> Transition {
        self.local(|navigator| Ok(navigator.previous()))
            .unwrap_or(Transition::Disabled)
    }

    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTarget`] for a target outside the
    /// sequence; nothing is published.
    pub fn goto(&self, moment_id: &str, beat_idx: usize) -> Result<Transition, NavigationError> {
        self.local(|navigator| navigator.goto(moment_id, beat_idx))
    }

    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTarget`] for an unresolvable beat id;
    /// nothing is published.
    pub fn goto_beat_id(&self, beat_id: &str) -> Result<Transition, NavigationError> {
        self.local(|navigator| navigator.goto_beat_id(beat_id))
    }

    /// Send a partial volume update to every target. Returns how many
    /// publishes were handed to the broker.
    pub fn send_volume(&self, update: SetVolumeBody) -> usize {
        if update.is_empty() {
            debug!("Not sending an empty volume update");
            return 0;
        }

        self.broadcast(SET_VOLUME, &update)
    }

    fn local(
        &self,
        step: impl FnOnce(&mut Navigator) -> Result<Transition, NavigationError>,
    ) -> Result<Transition, NavigationError> {
        let transition = {
            let mut state = lock(&self.state);
            let transition = step(&mut state.navigator)?;
            if transition.is_moved() {
                state.seeded = true;
            }
            transition
        };

        if let Some(to) = transition.target() {
            let body = GotoBeatBody {
                beat_id: to.beat_id(),
            };
            let sent = self.broadcast(GOTO_BEAT, &body);
            debug!("goto-beat {} sent to {sent} of {} targets", body.beat_id, self.targets.len());
        }

        Ok(transition)
    }

    fn broadcast<B: serde::Serialize>(&self, name: &str, body: &B) -> usize {
        self.targets
            .iter()
            .map(|exhibit| {
                let topic = self.topics.command(exhibit, name);
                self.client.publish_body(&topic, body, false)
            })
            .filter(|outcome| *outcome == PublishOutcome::Sent)
            .count()
    }
}

impl Drop for NavigationController {
    fn drop(&mut self) {
        self.detach();
    }
}
