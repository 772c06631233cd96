//! The WebSocket hub with real sockets on an ephemeral port.

use crate::helpers::{QUIET, WAIT, collect, connected, eventually, fast_policy};

use sync_core::broker::{HubHandle, start_hub, start_hub_with_hello_timeout};
use sync_core::error::transport::TransportError;
use sync_core::transport::{
    BrokerFrame, ClientCallbacks, ClientFrame, MessageClient, Will, WsConnector,
};

use common::RedactedToken;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

async fn hub(token: Option<&str>) -> HubHandle {
    start_hub("127.0.0.1:0", token.map(RedactedToken::new))
        .await
        .unwrap()
}

fn ws_client(hub: &HubHandle, device_id: &str, token: Option<&str>) -> MessageClient {
    let connector = WsConnector::new(&hub.url(), token.map(RedactedToken::new)).unwrap();
    MessageClient::new(
        device_id,
        Arc::new(connector),
        ClientCallbacks::new(),
        fast_policy(),
    )
}

/// **VALUE**: Verifies publish and subscribe work end to end through the hub.
#[tokio::test]
async fn given_two_ws_clients_when_publishing_then_subscriber_receives() {
    // GIVEN
    let hub = hub(Some("s3cret")).await;
    let display = ws_client(&hub, "basecamp-1", Some("s3cret"));
    let received = collect(&display, "cmd/dev/basecamp/goto-beat");
    display.connect();
    connected(&display).await;
    let docent = ws_client(&hub, "docent-1", Some("s3cret"));
    docent.connect();
    connected(&docent).await;
    eventually("hub subscription", || {
        hub.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;

    // WHEN
    docent.publish_body(
        "cmd/dev/basecamp/goto-beat",
        serde_json::json!({ "beat-id": "welcome-2" }),
        false,
    );

    // THEN
    eventually("delivery", || received.lock().unwrap().len() == 1).await;
    assert_eq!(hub.session_count(), 2);
    display.disconnect().await;
    docent.disconnect().await;
    eventually("sessions closed", || hub.session_count() == 0).await;
}

/// **VALUE**: Verifies a wrong token is rejected and reported as non-retryable.
///
/// **BUG THIS CATCHES**: Would catch an open hub accepting commands from any device on the
/// exhibit network.
#[tokio::test]
async fn given_wrong_token_when_connecting_then_rejected_error_reported() {
    // GIVEN
    let hub = hub(Some("s3cret")).await;
    let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    let connector = WsConnector::new(&hub.url(), Some(RedactedToken::new("wrong"))).unwrap();
    let client = MessageClient::new(
        "intruder",
        Arc::new(connector),
        ClientCallbacks::new().on_error(move |e: &TransportError| {
            if matches!(e, TransportError::Rejected { .. }) {
                sink.lock().unwrap().push(e.to_string());
            }
        }),
        fast_policy(),
    );

    // WHEN
    client.connect();

    // THEN
    eventually("rejection", || !errors.lock().unwrap().is_empty()).await;
    assert!(!client.is_connected());
    assert_eq!(hub.session_count(), 0);
    client.disconnect().await;
}

/// **VALUE**: Verifies the hub refuses a session that does not open with hello.
#[tokio::test]
async fn given_raw_socket_when_first_frame_not_hello_then_rejected() {
    // GIVEN
    let hub = hub(None).await;
    let (mut socket, _) = connect_async(hub.url()).await.unwrap();
    let subscribe = ClientFrame::Subscribe {
        topic: String::from("t"),
    };

    // WHEN
    socket
        .send(Message::Text(serde_json::to_string(&subscribe).unwrap().into()))
        .await
        .unwrap();

    // THEN
    let reply = tokio::time::timeout(WAIT, socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let Message::Text(text) = reply else {
        panic!("expected a text reply, got {reply:?}");
    };
    assert!(matches!(
        serde_json::from_str::<BrokerFrame>(text.as_str()).unwrap(),
        BrokerFrame::Rejected { .. }
    ));
    assert_eq!(hub.session_count(), 0);
}

/// **VALUE**: Verifies a connection that never sends hello is rejected and closed.
///
/// **WHY THIS MATTERS**: A port scanner or stuck kiosk on the exhibit network would otherwise
/// hold a hub task and socket open forever.
///
/// **BUG THIS CATCHES**: Would catch the hello read waiting without a time limit.
#[tokio::test]
async fn given_silent_socket_when_hello_times_out_then_rejected_and_closed() {
    // GIVEN: A hub that allows 100ms for hello
    let hub = start_hub_with_hello_timeout("127.0.0.1:0", None, Duration::from_millis(100))
        .await
        .unwrap();
    let (mut socket, _) = connect_async(hub.url()).await.unwrap();

    // WHEN: Nothing is sent
    let reply = tokio::time::timeout(WAIT, socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // THEN: Rejected, then the stream ends
    let Message::Text(text) = reply else {
        panic!("expected a text reply, got {reply:?}");
    };
    match serde_json::from_str::<BrokerFrame>(text.as_str()).unwrap() {
        BrokerFrame::Rejected { reason } => assert_eq!(reason, "hello timed out"),
        other => panic!("expected Rejected, got {other:?}"),
    }

    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "hub should close the silent connection");
    assert_eq!(hub.session_count(), 0);
}

/// **VALUE**: Verifies malformed frames are skipped without ending the session, and a dropped
/// socket fires its will.
#[tokio::test]
async fn given_raw_session_when_malformed_frame_then_session_survives_until_dropped() {
    // GIVEN
    let hub = hub(None).await;
    let observer = ws_client(&hub, "docent-1", None);
    let wills = collect(&observer, "state/dev/summit/availability");
    observer.connect();
    connected(&observer).await;

    let (mut socket, _) = connect_async(hub.url()).await.unwrap();
    let hello = ClientFrame::Hello {
        client_id: String::from("summit-1"),
        token: None,
        will: Some(Will {
            topic: String::from("state/dev/summit/availability"),
            payload: String::from("offline"),
            retain: true,
        }),
    };
    socket
        .send(Message::Text(serde_json::to_string(&hello).unwrap().into()))
        .await
        .unwrap();
    let welcome = tokio::time::timeout(WAIT, socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(welcome, Message::Text(r#"{"type":"welcome"}"#.into()));

    // WHEN
    socket
        .send(Message::Text("{not a frame".into()))
        .await
        .unwrap();
    let subscribe = ClientFrame::Subscribe {
        topic: String::from("ping"),
    };
    socket
        .send(Message::Text(serde_json::to_string(&subscribe).unwrap().into()))
        .await
        .unwrap();

    // THEN
    eventually("subscription after garbage", || hub.subscriber_count("ping") == 1).await;
    tokio::time::sleep(QUIET).await;
    assert!(wills.lock().unwrap().is_empty());

    drop(socket);
    eventually("will delivered", || wills.lock().unwrap().len() == 1).await;
    assert_eq!(
        hub.retained("state/dev/summit/availability").as_deref(),
        Some("offline")
    );
    observer.disconnect().await;
}

/// **VALUE**: Verifies hub shutdown ends sessions and clients notice.
#[tokio::test]
async fn given_connected_client_when_hub_shuts_down_then_client_disconnected() {
    // GIVEN
    let hub = hub(None).await;
    let client = ws_client(&hub, "overlook-1", None);
    client.connect();
    connected(&client).await;

    // WHEN
    hub.shutdown();

    // THEN
    tokio::time::timeout(WAIT, client.wait_for_connection(false))
        .await
        .unwrap();
    client.disconnect().await;
}
