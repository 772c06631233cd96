//! Topic routing shared by the in-memory broker and the hub.
//!
//! Exact-topic subscriptions, retained payloads and last wills. All state
//! sits behind one mutex; delivery is a non-blocking channel send per
//! subscriber, so no lock is held across an await.

use crate::transport::frames::{BrokerFrame, Will};

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, trace};
use tokio::sync::mpsc;

pub(crate) type SessionId = u64;

struct Session {
    client_id: String,
    tx: mpsc::UnboundedSender<BrokerFrame>,
    will: Option<Will>,
}

#[derive(Default)]
struct RouterState {
    sessions: HashMap<SessionId, Session>,
    subscriptions: HashMap<String, BTreeSet<SessionId>>,
    retained: HashMap<String, String>,
}

#[derive(Default)]
pub(crate) struct Router {
    state: Mutex<RouterState>,
    next_session: AtomicU64,
}

impl Router {
    fn state(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn open(
        &self,
        client_id: &str,
        will: Option<Will>,
        tx: mpsc::UnboundedSender<BrokerFrame>,
    ) -> SessionId {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        info!("Session {id} opened for {client_id}");
        self.state().sessions.insert(
            id,
            Session {
                client_id: client_id.to_string(),
                tx,
                will,
            },
        );
        id
    }

    /// Subscribe a session and hand it the topic's retained payload, if any.
    pub(crate) fn subscribe(&self, session: SessionId, topic: &str) {
        let mut state = self.state();
        let retained = state.retained.get(topic).cloned();

        let Some(tx) = state.sessions.get(&session).map(|s| s.tx.clone()) else {
            return;
        };

        state
            .subscriptions
            .entry(topic.to_string())
            .or_default()
            .insert(session);
        debug!("Session {session} subscribed to {topic}");

        if let Some(payload) = retained {
            let _ = tx.send(BrokerFrame::Message {
                topic: topic.to_string(),
                payload,
            });
        }
    }

    pub(crate) fn unsubscribe(&self, session: SessionId, topic: &str) {
        let mut state = self.state();
        if let Some(subscribers) = state.subscriptions.get_mut(topic) {
            subscribers.remove(&session);
            if subscribers.is_empty() {
                state.subscriptions.remove(topic);
            }
        }
        debug!("Session {session} unsubscribed from {topic}");
    }

    /// Deliver to every subscriber. A retained publish with an empty payload
    /// clears the retained value and is not delivered.
    pub(crate) fn publish(&self, topic: &str, payload: &str, retain: bool) {
        let mut state = self.state();

        if retain {
            if payload.is_empty() {
                state.retained.remove(topic);
                trace!("Cleared retained payload on {topic}");
                return;
            }
            state.retained.insert(topic.to_string(), payload.to_string());
        }

        let Some(subscribers) = state.subscriptions.get(topic) else {
            trace!("No subscribers for {topic}");
            return;
        };

        for session in subscribers {
            if let Some(s) = state.sessions.get(session) {
                let _ = s.tx.send(BrokerFrame::Message {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                });
            }
        }
    }

    /// End a session. Unless `clean`, the session's will is published.
    pub(crate) fn close(&self, session: SessionId, clean: bool) {
        let will = {
            let mut state = self.state();
            let Some(removed) = state.sessions.remove(&session) else {
                return;
            };

            state.subscriptions.retain(|_, subscribers| {
                subscribers.remove(&session);
                !subscribers.is_empty()
            });

            info!(
                "Session {session} for {} closed ({})",
                removed.client_id,
                if clean { "clean" } else { "dropped" }
            );

            if clean { None } else { removed.will }
        };

        if let Some(will) = will {
            debug!("Publishing will for session {session} to {}", will.topic);
            self.publish(&will.topic, &will.payload, will.retain);
        }
    }

    /// Forcefully end every session of `client_id` as if the network dropped.
    pub(crate) fn sever(&self, client_id: &str) -> usize {
        let sessions: Vec<SessionId> = self
            .state()
            .sessions
            .iter()
            .filter(|(_, s)| s.client_id == client_id)
            .map(|(id, _)| *id)
            .collect();

        for session in &sessions {
            self.close(*session, false);
        }
        sessions.len()
    }

    pub(crate) fn retained(&self, topic: &str) -> Option<String> {
        self.state().retained.get(topic).cloned()
    }

    pub(crate) fn subscriber_count(&self, topic: &str) -> usize {
        self.state()
            .subscriptions
            .get(topic)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    pub(crate) fn session_count(&self) -> usize {
        self.state().sessions.len()
    }
}
