use crate::helpers::{
    QUIET, collect, connected, eventually, fast_policy, memory_client,
};

use sync_core::broker::MemoryBroker;
use sync_core::error::transport::TransportError;
use sync_core::transport::{
    ClientCallbacks, MessageClient, PublishCallbacks, PublishOutcome, SubscriptionId, Will,
};

use models::Envelope;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

/// **VALUE**: Verifies topics subscribed before connecting are flushed on connect.
///
/// **WHY THIS MATTERS**: Surfaces register their hooks at mount, usually before the broker
/// answers. Those subscriptions must not be lost.
#[tokio::test]
async fn given_subscription_before_connect_when_connected_then_messages_delivered() {
    // GIVEN
    let broker = MemoryBroker::new();
    let display = memory_client(&broker, "basecamp-1");
    let received = collect(&display, "cmd/dev/basecamp/goto-beat");

    // WHEN
    display.connect();
    connected(&display).await;
    eventually("broker subscription", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;
    broker.inject("cmd/dev/basecamp/goto-beat", "hello", false);

    // THEN
    eventually("delivery", || received.lock().unwrap().len() == 1).await;
    assert_eq!(received.lock().unwrap()[0], "hello");
}

/// **VALUE**: Verifies every handler on a topic runs, in registration order.
#[tokio::test]
async fn given_two_handlers_when_message_arrives_then_both_run_in_order() {
    // GIVEN
    let broker = MemoryBroker::new();
    let client = memory_client(&broker, "summit-1");
    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second"] {
        let order = Arc::clone(&order);
        client.subscribe_to_topic("t", move |_| order.lock().unwrap().push(name));
    }
    client.connect();
    connected(&client).await;
    eventually("subscription", || broker.subscriber_count("t") == 1).await;

    // WHEN
    broker.inject("t", "x", false);

    // THEN
    eventually("both handlers", || order.lock().unwrap().len() == 2).await;
    assert_eq!(*order.lock().unwrap(), ["first", "second"]);
    assert_eq!(client.handler_count("t"), 2);
}

/// **VALUE**: Verifies a panicking handler neither stops its siblings nor later messages.
///
/// **BUG THIS CATCHES**: Would catch one buggy hook silencing every other hook on the topic.
#[tokio::test]
async fn given_panicking_handler_when_messages_arrive_then_others_still_receive() {
    // GIVEN
    let broker = MemoryBroker::new();
    let client = memory_client(&broker, "summit-1");
    client.subscribe_to_topic("t", |_| panic!("handler bug"));
    let received = collect(&client, "t");
    client.connect();
    connected(&client).await;
    eventually("subscription", || broker.subscriber_count("t") == 1).await;

    // WHEN
    broker.inject("t", "one", false);
    broker.inject("t", "two", false);

    // THEN
    eventually("both messages", || received.lock().unwrap().len() == 2).await;
    assert!(client.is_connected());
}

/// **VALUE**: Verifies unsubscribe removes exactly one handler and the last one releases the
/// broker subscription.
#[tokio::test]
async fn given_two_handlers_when_unsubscribed_one_by_one_then_broker_released_last() {
    // GIVEN
    let broker = MemoryBroker::new();
    let client = memory_client(&broker, "overlook-1");
    let first = client.subscribe_to_topic("t", |_| {});
    let second = client.subscribe_to_topic("t", |_| {});
    client.connect();
    connected(&client).await;
    eventually("subscription", || broker.subscriber_count("t") == 1).await;

    // WHEN/THEN
    assert!(client.unsubscribe_from_topic("t", first));
    assert!(!client.unsubscribe_from_topic("t", first));
    assert_eq!(client.handler_count("t"), 1);
    assert_eq!(broker.subscriber_count("t"), 1);

    assert!(client.unsubscribe_from_topic("t", second));
    eventually("broker release", || broker.subscriber_count("t") == 0).await;
}

/// **VALUE**: Verifies a handler can unsubscribe itself while being dispatched.
///
/// **BUG THIS CATCHES**: Would catch a deadlock or iterator invalidation when the handler list
/// changes mid-dispatch.
#[tokio::test]
async fn given_self_removing_handler_when_messages_arrive_then_runs_once() {
    // GIVEN
    let broker = MemoryBroker::new();
    let client = memory_client(&broker, "overlook-1");
    let calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
    let weak = client.downgrade();
    let id = {
        let calls = Arc::clone(&calls);
        let slot = Arc::clone(&slot);
        client.subscribe_to_topic("t", move |message| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let (Some(client), Some(id)) = (weak.upgrade(), *slot.lock().unwrap()) {
                client.unsubscribe_from_topic(message.topic, id);
            }
        })
    };
    *slot.lock().unwrap() = Some(id);
    let witness = collect(&client, "t");
    client.connect();
    connected(&client).await;
    eventually("subscription", || broker.subscriber_count("t") == 1).await;

    // WHEN
    broker.inject("t", "one", false);
    broker.inject("t", "two", false);

    // THEN
    eventually("witness sees both", || witness.lock().unwrap().len() == 2).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies disconnect is idempotent and safe on a never-connected client.
#[tokio::test]
async fn given_client_when_disconnect_twice_then_same_end_state() {
    // GIVEN
    let broker = MemoryBroker::new();
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    let client = MessageClient::new(
        "basecamp-1",
        Arc::new(broker.clone()),
        ClientCallbacks::new().on_connection_change(move |c| sink.lock().unwrap().push(c)),
        fast_policy(),
    );
    client.subscribe_to_topic("t", |_| {});
    client.connect();
    connected(&client).await;

    // WHEN
    client.disconnect().await;
    client.disconnect().await;

    // THEN
    assert!(!client.is_connected());
    assert_eq!(client.handler_count("t"), 0);
    assert_eq!(*transitions.lock().unwrap(), [true, false]);
    eventually("session closed", || broker.session_count() == 0).await;

    let never = memory_client(&broker, "never");
    never.disconnect().await;
    assert!(!never.is_connected());
}

/// **VALUE**: Verifies the client reconnects, resubscribes and reports each transition once.
///
/// **WHY THIS MATTERS**: Exhibit networks drop. Displays must recover without anyone
/// touching them.
#[tokio::test]
async fn given_connected_client_when_session_severed_then_reconnects_and_resubscribes() {
    // GIVEN
    let broker = MemoryBroker::new();
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(AtomicUsize::new(0));
    let (sink, error_count) = (Arc::clone(&transitions), Arc::clone(&errors));
    let client = MessageClient::new(
        "basecamp-1",
        Arc::new(broker.clone()),
        ClientCallbacks::new()
            .on_connection_change(move |c| sink.lock().unwrap().push(c))
            .on_error(move |_| {
                error_count.fetch_add(1, Ordering::SeqCst);
            }),
        fast_policy(),
    );
    let received = collect(&client, "t");
    client.connect();
    connected(&client).await;

    // WHEN
    assert_eq!(broker.sever("basecamp-1"), 1);

    // THEN
    eventually("reconnected", || *transitions.lock().unwrap() == [true, false, true]).await;
    eventually("resubscribed", || broker.subscriber_count("t") == 1).await;
    broker.inject("t", "after", false);
    eventually("delivery after reconnect", || received.lock().unwrap().len() == 1).await;
    assert!(errors.load(Ordering::SeqCst) >= 1);
    client.disconnect().await;
}

/// **VALUE**: Verifies connection failures surface through on_error and recovery is automatic.
#[tokio::test]
async fn given_unreachable_broker_when_it_comes_back_then_client_connects() {
    // GIVEN
    let broker = MemoryBroker::new();
    broker.set_reachable(false);
    let errors = Arc::new(AtomicUsize::new(0));
    let error_count = Arc::clone(&errors);
    let client = MessageClient::new(
        "summit-1",
        Arc::new(broker.clone()),
        ClientCallbacks::new().on_error(move |e: &TransportError| {
            if e.is_retryable() {
                error_count.fetch_add(1, Ordering::SeqCst);
            }
        }),
        fast_policy(),
    );

    // WHEN
    client.connect();
    eventually("a connect error", || errors.load(Ordering::SeqCst) >= 1).await;
    assert!(!client.is_connected());
    broker.set_reachable(true);

    // THEN
    connected(&client).await;
    client.disconnect().await;
}

/// **VALUE**: Verifies publish callbacks report local success and failure.
#[tokio::test]
async fn given_publish_callbacks_when_publishing_then_local_outcome_reported() {
    // GIVEN
    let broker = MemoryBroker::new();
    let client = memory_client(&broker, "docent-1");
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let envelope: Envelope = sync_core::protocol::make_envelope("docent-1", json!({}));

    // WHEN: offline
    let (ok, err) = (Arc::clone(&outcomes), Arc::clone(&outcomes));
    let offline = client.publish_with(
        "t",
        &envelope,
        false,
        PublishCallbacks::new()
            .on_success(move || ok.lock().unwrap().push("success"))
            .on_error(move |_| err.lock().unwrap().push("error")),
    );

    // WHEN: online
    client.connect();
    connected(&client).await;
    let ok = Arc::clone(&outcomes);
    let online = client.publish_with(
        "t",
        &envelope,
        false,
        PublishCallbacks::new().on_success(move || ok.lock().unwrap().push("success")),
    );

    // THEN
    assert_eq!(offline, PublishOutcome::Dropped);
    assert_eq!(online, PublishOutcome::Sent);
    assert_eq!(*outcomes.lock().unwrap(), ["error", "success"]);
    client.disconnect().await;
}

/// **VALUE**: Verifies dropping a connected client without disconnect fires its will.
///
/// **BUG THIS CATCHES**: Would catch a crashed display staying "online" forever.
#[tokio::test]
async fn given_client_with_will_when_dropped_then_will_published() {
    // GIVEN
    let broker = MemoryBroker::new();
    let observer = memory_client(&broker, "docent-1");
    let seen = collect(&observer, "state/dev/basecamp/availability");
    observer.connect();
    connected(&observer).await;

    let display = memory_client(&broker, "basecamp-1");
    display.set_will(Some(Will {
        topic: String::from("state/dev/basecamp/availability"),
        payload: String::from("gone"),
        retain: true,
    }));
    display.connect();
    connected(&display).await;
    eventually("observer subscribed", || {
        broker.subscriber_count("state/dev/basecamp/availability") == 1
    })
    .await;

    // WHEN
    drop(display);

    // THEN
    eventually("will delivered", || seen.lock().unwrap().len() == 1).await;
    assert_eq!(seen.lock().unwrap()[0], "gone");
    assert_eq!(
        broker.retained("state/dev/basecamp/availability").as_deref(),
        Some("gone")
    );
    tokio::time::sleep(QUIET).await;
    observer.disconnect().await;
}
