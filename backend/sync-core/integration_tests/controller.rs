use crate::helpers::{
    QUIET, bodies, collect, connected, envelope_payload, eventually, memory_client,
    welcome_problem,
};

use sync_core::broker::MemoryBroker;
use sync_core::navigation::NavigationController;
use sync_core::protocol::Topics;
use sync_core::transport::MessageClient;

use models::{GotoBeatBody, SetVolumeBody};

use serde_json::json;

const TARGETS: [&str; 2] = ["basecamp", "summit"];

async fn docent_controller(broker: &MemoryBroker) -> (MessageClient, NavigationController) {
    let client = memory_client(broker, "docent-1");
    let controller = NavigationController::new(
        client.clone(),
        Topics::new("dev"),
        TARGETS.iter().map(|t| t.to_string()).collect(),
        welcome_problem(),
    )
    .unwrap();
    controller.attach();
    client.connect();
    connected(&client).await;
    (client, controller)
}

fn report(broker: &MemoryBroker, exhibit: &str, beat_id: &str, retain: bool) {
    broker.inject(
        &format!("state/dev/{exhibit}/goto-beat"),
        &envelope_payload(
            exhibit,
            GotoBeatBody {
                beat_id: beat_id.to_string(),
            },
        ),
        retain,
    );
}

/// **VALUE**: Verifies a freshly started docent picks up where the displays already are.
///
/// **WHY THIS MATTERS**: Restarting the tablet mid-tour must not jump the room back to the
/// first beat.
#[tokio::test]
async fn given_retained_report_when_controller_attaches_then_position_seeded() {
    // GIVEN
    let broker = MemoryBroker::new();
    report(&broker, "basecamp", "problem-1", true);

    // WHEN
    let (_client, controller) = docent_controller(&broker).await;

    // THEN
    eventually("seeded", || controller.current_beat_id() == "problem-1").await;
    assert_eq!(controller.confirmed_beat("basecamp").as_deref(), Some("problem-1"));
    assert_eq!(controller.progress(), (3, 5));
}

/// **VALUE**: Verifies reports after a local move only confirm; local intent wins.
///
/// **BUG THIS CATCHES**: Would catch a slow display echo dragging the docent back a beat.
#[tokio::test]
async fn given_local_move_when_display_reports_other_beat_then_local_kept() {
    // GIVEN
    let broker = MemoryBroker::new();
    let (_client, controller) = docent_controller(&broker).await;
    eventually("subscribed", || {
        broker.subscriber_count("state/dev/summit/goto-beat") == 1
            && broker.subscriber_count("state/dev/basecamp/goto-beat") == 1
    })
    .await;
    controller.next();

    // WHEN
    report(&broker, "summit", "welcome-1", false);
    report(&broker, "basecamp", "welcome-2", false);

    // THEN
    eventually("both confirmed", || {
        controller.confirmed_beat("summit").is_some()
            && controller.confirmed_beat("basecamp").is_some()
    })
    .await;
    assert_eq!(controller.current_beat_id(), "welcome-2");
    assert!(!controller.is_synchronized());

    report(&broker, "summit", "welcome-2", false);
    eventually("synchronized", || controller.is_synchronized()).await;
}

/// **VALUE**: Verifies navigation and volume go to every target exhibit.
#[tokio::test]
async fn given_two_targets_when_navigating_then_each_receives_command() {
    // GIVEN
    let broker = MemoryBroker::new();
    let display = memory_client(&broker, "observer");
    let basecamp = collect(&display, "cmd/dev/basecamp/goto-beat");
    let summit = collect(&display, "cmd/dev/summit/goto-beat");
    let volume = collect(&display, "cmd/dev/summit/set-volume");
    display.connect();
    connected(&display).await;
    let (_client, controller) = docent_controller(&broker).await;
    eventually("observer subscribed", || {
        ["cmd/dev/basecamp/goto-beat", "cmd/dev/summit/goto-beat", "cmd/dev/summit/set-volume"]
            .iter()
            .all(|topic| broker.subscriber_count(topic) == 1)
    })
    .await;

    // WHEN
    controller.goto_beat_id("problem-2").unwrap();
    let sent = controller.send_volume(SetVolumeBody {
        level: None,
        muted: Some(true),
    });
    let empty = controller.send_volume(SetVolumeBody::default());

    // THEN
    assert_eq!(sent, 2);
    assert_eq!(empty, 0);
    eventually("deliveries", || {
        basecamp.lock().unwrap().len() == 1
            && summit.lock().unwrap().len() == 1
            && volume.lock().unwrap().len() == 1
    })
    .await;
    assert_eq!(bodies(&summit), [json!({ "beat-id": "problem-2" })]);
    assert_eq!(bodies(&volume), [json!({ "volume-muted": true })]);
    tokio::time::sleep(QUIET).await;
    assert_eq!(volume.lock().unwrap().len(), 1);
}

/// **VALUE**: Verifies an invalid goto is refused locally and nothing is published.
#[tokio::test]
async fn given_unknown_beat_when_goto_then_error_and_no_publish() {
    // GIVEN
    let broker = MemoryBroker::new();
    let display = memory_client(&broker, "observer");
    let commands = collect(&display, "cmd/dev/basecamp/goto-beat");
    display.connect();
    connected(&display).await;
    let (_client, controller) = docent_controller(&broker).await;
    eventually("observer subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;

    // WHEN
    let result = controller.goto_beat_id("epilogue-1");

    // THEN
    assert!(result.is_err());
    assert_eq!(controller.current_beat_id(), "welcome-1");
    tokio::time::sleep(QUIET).await;
    assert!(commands.lock().unwrap().is_empty());
}
