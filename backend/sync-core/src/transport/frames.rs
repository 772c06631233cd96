//! Broker frame protocol.
//!
//! One JSON object per WebSocket text message, tagged by `type`. The
//! `payload` of a publish is opaque text (normally an envelope) and is
//! delivered to subscribers byte-for-byte.

use serde::{Deserialize, Serialize};

/// Message the broker publishes on a session's behalf if the session ends
/// without a `disconnect` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Will {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Must be the first frame of a session.
    Hello {
        client_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        will: Option<Will>,
    },
    Subscribe {
        topic: String,
    },
    Unsubscribe {
        topic: String,
    },
    Publish {
        topic: String,
        payload: String,
        #[serde(default)]
        retain: bool,
    },
    /// Clean end of session; suppresses the will.
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BrokerFrame {
    Welcome,
    Rejected { reason: String },
    Message { topic: String, payload: String },
}
