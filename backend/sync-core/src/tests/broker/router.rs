use crate::broker::router::Router;
use crate::transport::frames::{BrokerFrame, Will};

use tokio::sync::mpsc;

fn session(router: &Router, client_id: &str, will: Option<Will>) -> (u64, mpsc::UnboundedReceiver<BrokerFrame>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (router.open(client_id, will, tx), rx)
}

fn message(topic: &str, payload: &str) -> BrokerFrame {
    BrokerFrame::Message {
        topic: topic.to_string(),
        payload: payload.to_string(),
    }
}

/// **VALUE**: Verifies a new subscriber immediately receives the retained payload.
///
/// **WHY THIS MATTERS**: A docent tablet rebooting mid-tour learns each display's beat and
/// availability from retained reports.
#[test]
fn given_retained_payload_when_subscribing_then_delivered_immediately() {
    // GIVEN
    let router = Router::default();
    router.publish("state/dev/basecamp/goto-beat", "r1", true);
    let (id, mut rx) = session(&router, "docent", None);

    // WHEN
    router.subscribe(id, "state/dev/basecamp/goto-beat");

    // THEN
    assert_eq!(rx.try_recv().unwrap(), message("state/dev/basecamp/goto-beat", "r1"));
}

/// **VALUE**: Verifies an empty retained publish clears the retained value.
#[test]
fn given_retained_payload_when_empty_retained_publish_then_cleared() {
    let router = Router::default();
    router.publish("t", "r1", true);

    router.publish("t", "", true);

    assert_eq!(router.retained("t"), None);
}

/// **VALUE**: Verifies the will is published on an unclean close and suppressed on a clean one.
///
/// **BUG THIS CATCHES**: Would catch a display that shut down politely being shown as crashed,
/// or a crashed one still shown online.
#[test]
fn given_sessions_with_wills_when_closed_then_will_only_for_unclean() {
    // GIVEN
    let router = Router::default();
    let (observer, mut rx) = session(&router, "docent", None);
    router.subscribe(observer, "avail");
    let will = Will {
        topic: String::from("avail"),
        payload: String::from("offline"),
        retain: true,
    };
    let (clean, _) = session(&router, "basecamp", Some(will.clone()));
    let (dropped, _) = session(&router, "summit", Some(will));

    // WHEN
    router.close(clean, true);
    router.close(dropped, false);

    // THEN
    assert_eq!(rx.try_recv().unwrap(), message("avail", "offline"));
    assert!(rx.try_recv().is_err());
    assert_eq!(router.retained("avail").as_deref(), Some("offline"));
    assert_eq!(router.session_count(), 1);
}

/// **VALUE**: Verifies closing a session releases its subscriptions.
#[test]
fn given_subscribed_session_when_closed_then_subscriptions_released() {
    let router = Router::default();
    let (id, _rx) = session(&router, "basecamp", None);
    router.subscribe(id, "cmd/dev/basecamp/goto-beat");

    router.close(id, true);

    assert_eq!(router.subscriber_count("cmd/dev/basecamp/goto-beat"), 0);
}

/// **VALUE**: Verifies sever drops every session of a client and fires its wills.
#[test]
fn given_client_sessions_when_severed_then_all_dropped() {
    let router = Router::default();
    let (_a, mut rx) = session(&router, "basecamp", None);
    let (_b, _) = session(&router, "basecamp", None);
    let (_c, _) = session(&router, "summit", None);

    let severed = router.sever("basecamp");

    assert_eq!(severed, 2);
    assert_eq!(router.session_count(), 1);
    // The session's sender is gone, so its receiver is closed.
    assert!(matches!(
        rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}
