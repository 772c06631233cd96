//! End-to-end walkthroughs: a docent controller and display services on one
//! in-memory broker.

use crate::helpers::{
    QUIET, bodies, collect, connected, envelope_payload, eventually, memory_client,
    welcome_problem,
};

use sync_core::broker::MemoryBroker;
use sync_core::navigation::{NavigationController, Transition};
use sync_core::protocol::Topics;
use sync_core::sync::{LoggingAudioEngine, SharedState, StateAccess, SyncService};
use sync_core::transport::PublishOutcome;

use models::{NavigationState, SequenceBuilder, VolumeState};

use std::sync::Arc;

use serde_json::json;

fn topics() -> Topics {
    Topics::new("dev")
}

/// **VALUE**: `next` from the last beat of `welcome` crosses into `problem` and tells the
/// display where to go.
#[tokio::test]
async fn given_last_beat_of_moment_when_next_then_first_beat_of_next_moment_published() {
    // GIVEN
    let broker = MemoryBroker::new();
    let display = memory_client(&broker, "basecamp-1");
    let commands = collect(&display, "cmd/dev/basecamp/goto-beat");
    display.connect();
    connected(&display).await;

    let docent = memory_client(&broker, "docent-1");
    docent.connect();
    connected(&docent).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;

    let controller = NavigationController::new(
        docent.clone(),
        topics(),
        vec![String::from("basecamp")],
        welcome_problem(),
    )
    .unwrap();
    controller.goto("welcome", 2).unwrap();
    eventually("setup command", || commands.lock().unwrap().len() == 1).await;
    commands.lock().unwrap().clear();

    // WHEN
    let transition = controller.next();

    // THEN
    assert!(transition.is_moved());
    assert_eq!(controller.state().moment_id(), "problem");
    assert_eq!(controller.state().beat_idx(), 0);
    eventually("goto-beat delivered", || commands.lock().unwrap().len() == 1).await;
    assert_eq!(bodies(&commands), [json!({ "beat-id": "problem-1" })]);
}

/// **VALUE**: `previous` from the first beat of `problem` lands on the last beat of `welcome`.
#[tokio::test]
async fn given_first_beat_of_moment_when_previous_then_last_beat_of_previous_moment() {
    // GIVEN
    let broker = MemoryBroker::new();
    let docent = memory_client(&broker, "docent-1");
    let controller = NavigationController::new(
        docent,
        topics(),
        vec![String::from("basecamp")],
        welcome_problem(),
    )
    .unwrap();
    controller.goto("problem", 0).unwrap();

    // WHEN
    let transition = controller.previous();

    // THEN
    let expected = NavigationState::within(&welcome_problem(), "welcome", 2).unwrap();
    assert_eq!(transition.target(), Some(&expected));
    assert_eq!(controller.current_beat_id(), "welcome-3");
}

/// **VALUE**: A partial volume update changes only the field it carries and the report echoes
/// both fields.
///
/// **BUG THIS CATCHES**: Would catch an absent `volume-muted` being read as `false` and
/// unmuting the room.
#[tokio::test]
async fn given_muted_display_when_level_only_update_then_mute_kept_and_both_reported() {
    // GIVEN
    let broker = MemoryBroker::new();
    let volume = SharedState::new(VolumeState {
        level: 1.0,
        muted: true,
    });
    let service = SyncService::new(memory_client(&broker, "basecamp-1"), topics(), "basecamp")
        .unwrap()
        .with_volume(Arc::new(volume.clone()), Arc::new(LoggingAudioEngine));
    service.start();
    connected(service.client()).await;

    let docent = memory_client(&broker, "docent-1");
    let reports = collect(&docent, "state/dev/basecamp/set-volume");
    docent.connect();
    connected(&docent).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/set-volume") == 1
    })
    .await;
    eventually("initial report", || !reports.lock().unwrap().is_empty()).await;
    reports.lock().unwrap().clear();

    // WHEN
    docent.publish_body(
        "cmd/dev/basecamp/set-volume",
        json!({ "volume-level": 0.4 }),
        false,
    );

    // THEN
    eventually("volume report", || !reports.lock().unwrap().is_empty()).await;
    assert_eq!(
        volume.get(),
        VolumeState {
            level: 0.4,
            muted: true
        }
    );
    assert_eq!(
        bodies(&reports),
        [json!({ "volume-level": 0.4, "volume-muted": true })]
    );
    service.shutdown().await;
}

/// **VALUE**: Publishing while disconnected is a silent no-op and nothing is replayed later.
///
/// **BUG THIS CATCHES**: Would catch an offline queue flushing stale navigation commands
/// onto displays when the network comes back.
#[tokio::test]
async fn given_disconnected_client_when_publishing_then_dropped_and_never_delivered() {
    // GIVEN
    let broker = MemoryBroker::new();
    let observer = memory_client(&broker, "basecamp-1");
    let seen = collect(&observer, "cmd/dev/basecamp/goto-beat");
    observer.connect();
    connected(&observer).await;
    let docent = memory_client(&broker, "docent-1");

    // WHEN
    let outcome = docent.publish_body(
        "cmd/dev/basecamp/goto-beat",
        json!({ "beat-id": "welcome-2" }),
        false,
    );
    docent.connect();
    connected(&docent).await;
    tokio::time::sleep(QUIET).await;

    // THEN
    assert_eq!(outcome, PublishOutcome::Dropped);
    assert!(seen.lock().unwrap().is_empty());
    observer.disconnect().await;
    docent.disconnect().await;
}

/// **VALUE**: Garbage on a command topic is logged and skipped; the display keeps working.
#[tokio::test]
async fn given_malformed_commands_when_valid_command_follows_then_it_is_applied() {
    // GIVEN
    let broker = MemoryBroker::new();
    let sequence = welcome_problem();
    let position = SharedState::new(sequence.first_state().unwrap());
    let service = SyncService::new(memory_client(&broker, "basecamp-1"), topics(), "basecamp")
        .unwrap()
        .with_beat(Arc::clone(&sequence), Arc::new(position.clone()));
    service.start();
    connected(service.client()).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;

    // WHEN
    for garbage in [
        "not json",
        "{}",
        r#"{"meta":{"id":"x"},"body":{}}"#,
        &envelope_payload("docent-1", json!({ "beat-id": "nowhere-9" })),
        &envelope_payload("docent-1", json!({ "volume-level": 0.2 })),
    ] {
        broker.inject("cmd/dev/basecamp/goto-beat", garbage, false);
    }
    broker.inject(
        "cmd/dev/basecamp/goto-beat",
        &envelope_payload("docent-1", json!({ "beat-id": "problem-2" })),
        false,
    );

    // THEN
    eventually("valid command applied", || {
        position.get().beat_id() == "problem-2"
    })
    .await;
    assert!(service.is_connected());
    service.shutdown().await;
}

/// **VALUE**: Moving past either end of the sequence is disabled and publishes nothing.
#[tokio::test]
async fn given_sequence_end_when_next_then_disabled_without_publish() {
    // GIVEN
    let broker = MemoryBroker::new();
    let display = memory_client(&broker, "basecamp-1");
    let commands = collect(&display, "cmd/dev/basecamp/goto-beat");
    display.connect();
    connected(&display).await;
    let docent = memory_client(&broker, "docent-1");
    docent.connect();
    connected(&docent).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;
    let controller = NavigationController::new(
        docent,
        topics(),
        vec![String::from("basecamp")],
        welcome_problem(),
    )
    .unwrap();
    controller.goto_beat_id("problem-2").unwrap();
    eventually("setup command", || commands.lock().unwrap().len() == 1).await;

    // WHEN
    let transition = controller.next();

    // THEN
    assert_eq!(transition, Transition::Disabled);
    assert!(controller.is_next_disabled());
    tokio::time::sleep(QUIET).await;
    assert_eq!(commands.lock().unwrap().len(), 1);
}

/// **VALUE**: A display whose content carries CMS handles follows the docent beat for beat.
///
/// **WHY THIS MATTERS**: The docent publishes `<moment>-<ordinal>` ids while the CMS names
/// beats with its own handles. Both must address the same beat or the room desynchronizes
/// with no error anywhere.
#[tokio::test]
async fn given_display_content_with_handles_when_docent_navigates_then_display_follows() {
    // GIVEN: Shared content with custom handles
    let sequence = Arc::new(
        SequenceBuilder::default()
            .with_moment_handles(
                "welcome",
                "Welcome",
                vec![Some(String::from("intro")), Some(String::from("overview")), None],
            )
            .with_moment_handles(
                "problem",
                "The Problem",
                vec![Some(String::from("problem-hook")), None],
            )
            .build()
            .unwrap(),
    );

    let broker = MemoryBroker::new();
    let position = SharedState::new(sequence.first_state().unwrap());
    let service = SyncService::new(
        memory_client(&broker, "basecamp-1"),
        topics(),
        "basecamp",
    )
    .unwrap()
    .with_beat(Arc::clone(&sequence), Arc::new(position.clone()));
    service.start();
    connected(service.client()).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;

    let docent = memory_client(&broker, "docent-1");
    docent.connect();
    connected(&docent).await;
    let controller = NavigationController::new(
        docent,
        topics(),
        vec![String::from("basecamp")],
        Arc::clone(&sequence),
    )
    .unwrap();

    // WHEN/THEN: Each step lands the display on the docent's beat
    for _ in 0..4 {
        assert!(controller.next().is_moved());
        let expected = controller.state();
        eventually("display follows docent", || position.get() == expected).await;
    }
    assert_eq!(position.get().beat_id(), "problem-2");

    service.shutdown().await;
}
