//! Shared fixtures for the integration tests.
//!
//! - clients on an in-memory broker with a fast reconnect policy
//! - polling helpers for asynchronous delivery
//! - payload collectors

use models::{Sequence, SequenceBuilder};
use sync_core::broker::MemoryBroker;
use sync_core::protocol::{encode_envelope, make_envelope};
use sync_core::transport::{ClientCallbacks, Connector, MessageClient, ReconnectPolicy};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

pub const WAIT: Duration = Duration::from_secs(3);
pub const QUIET: Duration = Duration::from_millis(150);

pub fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy {
        initial_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(50),
        multiplier: 2.0,
    }
}

pub fn client_on(connector: Arc<dyn Connector>, device_id: &str) -> MessageClient {
    MessageClient::new(device_id, connector, ClientCallbacks::new(), fast_policy())
}

pub fn memory_client(broker: &MemoryBroker, device_id: &str) -> MessageClient {
    client_on(Arc::new(broker.clone()), device_id)
}

/// Poll `condition` until it holds, panicking after [`WAIT`].
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn connected(client: &MessageClient) {
    tokio::time::timeout(WAIT, client.wait_for_connection(true))
        .await
        .expect("client did not connect in time");
}

/// Collect every payload delivered on `topic`.
pub fn collect(client: &MessageClient, topic: &str) -> Arc<Mutex<Vec<String>>> {
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&payloads);
    client.subscribe_to_topic(topic, move |message| {
        sink.lock().unwrap().push(message.payload.to_string());
    });
    payloads
}

/// Bodies of the collected payloads, parsed as JSON.
pub fn bodies(payloads: &Arc<Mutex<Vec<String>>>) -> Vec<serde_json::Value> {
    payloads
        .lock()
        .unwrap()
        .iter()
        .map(|p| {
            let envelope: serde_json::Value = serde_json::from_str(p).unwrap();
            envelope["body"].clone()
        })
        .collect()
}

pub fn envelope_payload<B: Serialize>(source: &str, body: B) -> String {
    encode_envelope(&make_envelope(source, body)).unwrap()
}

/// `welcome` (3 beats) followed by `problem` (2 beats).
pub fn welcome_problem() -> Arc<Sequence> {
    Arc::new(
        SequenceBuilder::default()
            .with_moment("welcome", "Welcome", 3)
            .with_moment("problem", "The Problem", 2)
            .build()
            .unwrap(),
    )
}
