//! Availability: `online` on every connect, `offline` as the last will and on
//! clean shutdown, plus a monitor for other exhibits' availability.

use crate::error::protocol::ProtocolError;
use crate::protocol::command::{Command, decode_command};
use crate::protocol::envelope::{encode_envelope, make_envelope};
use crate::protocol::topics::{AVAILABILITY, Topics};
use crate::sync::state_access::{SharedState, StateAccess};
use crate::transport::client::{MessageClient, PublishOutcome, SubscriptionId};
use crate::transport::frames::Will;

use models::{AvailabilityBody, AvailabilityStatus};

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::sync::watch;

pub fn availability_topic(topics: &Topics, exhibit: &str) -> String {
    topics.state(exhibit, AVAILABILITY)
}

fn status_body(status: AvailabilityStatus) -> Value {
    json!({ "status": status.as_str() })
}

/// Will announcing `offline` (retained) if the session drops.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the envelope cannot be serialized.
pub fn offline_will(topics: &Topics, exhibit: &str, device_id: &str) -> Result<Will, ProtocolError> {
    let envelope = make_envelope(
        device_id,
        AvailabilityBody {
            status: AvailabilityStatus::Offline,
        },
    );

    Ok(Will {
        topic: availability_topic(topics, exhibit),
        payload: encode_envelope(&envelope)?,
        retain: true,
    })
}

/// Register the offline will and the online birth message on `client`.
///
/// # Errors
///
/// See [`offline_will`].
pub fn register(client: &MessageClient, topics: &Topics, exhibit: &str) -> Result<(), ProtocolError> {
    client.set_will(Some(offline_will(topics, exhibit, client.device_id())?));
    client.set_birth(
        availability_topic(topics, exhibit),
        status_body(AvailabilityStatus::Online),
        true,
    );
    Ok(())
}

/// Publish `status` (retained) right now.
pub fn announce(
    client: &MessageClient,
    topics: &Topics,
    exhibit: &str,
    status: AvailabilityStatus,
) -> PublishOutcome {
    client.publish_body(&availability_topic(topics, exhibit), status_body(status), true)
}

/// Tracks the availability of a set of exhibits.
pub struct AvailabilityMonitor {
    client: MessageClient,
    topics: Topics,
    exhibits: Vec<String>,
    statuses: SharedState<HashMap<String, AvailabilityStatus>>,
    subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
}

impl AvailabilityMonitor {
    pub fn new(client: MessageClient, topics: Topics, exhibits: Vec<String>) -> Self {
        Self {
            client,
            topics,
            exhibits,
            statuses: SharedState::default(),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Idempotent.
    pub fn attach(&self) {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !subscriptions.is_empty() {
            return;
        }

        for exhibit in &self.exhibits {
            let topic = availability_topic(&self.topics, exhibit);
            let statuses = self.statuses.clone();
            let source = exhibit.clone();
            let id = self.client.subscribe_to_topic(topic.clone(), move |message| {
                match decode_command(AVAILABILITY, message.payload) {
                    Ok((_, Command::Availability(status))) => {
                        info!("{source} is {}", status.as_str());
                        statuses.update(&|current| {
                            let mut next = current.clone();
                            next.insert(source.clone(), status);
                            next
                        });
                    }
                    Ok((_, other)) => debug!("Ignoring availability report from {source}: {other:?}"),
                    Err(e) => warn!("Discarding malformed availability from {source}: {e}"),
                }
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

    /// `None` until the exhibit has reported at least once.
    pub fn status(&self, exhibit: &str) -> Option<AvailabilityStatus> {
        self.statuses.get().get(exhibit).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, AvailabilityStatus> {
        self.statuses.get()
    }

    pub fn watch(&self) -> watch::Receiver<HashMap<String, AvailabilityStatus>> {
        self.statuses.watch()
    }
}

impl Drop for AvailabilityMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}
