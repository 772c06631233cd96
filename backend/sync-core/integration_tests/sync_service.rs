use crate::helpers::{
    QUIET, bodies, collect, connected, envelope_payload, eventually, memory_client,
    welcome_problem,
};

use sync_core::broker::MemoryBroker;
use sync_core::protocol::{Topics, make_envelope_at};
use sync_core::sync::{AvailabilityMonitor, LoggingAudioEngine, SharedState, SyncService};

use models::{AvailabilityStatus, GotoBeatBody, VolumeState};

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::json;

const AVAILABILITY: &str = "state/dev/basecamp/availability";

fn display_service(broker: &MemoryBroker) -> SyncService {
    let sequence = welcome_problem();
    SyncService::new(
        memory_client(broker, "basecamp-1"),
        Topics::new("dev"),
        "basecamp",
    )
    .unwrap()
    .with_volume(
        Arc::new(SharedState::new(VolumeState::default())),
        Arc::new(LoggingAudioEngine),
    )
    .with_beat(
        Arc::clone(&sequence),
        Arc::new(SharedState::new(sequence.first_state().unwrap())),
    )
}

fn status_of(payload: &str) -> String {
    let envelope: serde_json::Value = serde_json::from_str(payload).unwrap();
    envelope["body"]["status"].as_str().unwrap().to_string()
}

/// **VALUE**: Verifies the availability lifecycle of a clean start and shutdown.
///
/// **WHY THIS MATTERS**: The docent tablet greys out displays that are not online.
#[tokio::test]
async fn given_started_service_when_shutdown_twice_then_online_then_offline_retained() {
    // GIVEN
    let broker = MemoryBroker::new();
    let service = display_service(&broker);

    // WHEN
    service.start();
    connected(service.client()).await;
    eventually("online retained", || broker.retained(AVAILABILITY).is_some()).await;
    let online = broker.retained(AVAILABILITY).unwrap();
    service.shutdown().await;
    service.shutdown().await;

    // THEN
    assert_eq!(status_of(&online), "online");
    assert!(!service.is_connected());
    eventually("session closed", || broker.session_count() == 0).await;
    assert_eq!(status_of(&broker.retained(AVAILABILITY).unwrap()), "offline");
    assert_eq!(broker.subscriber_count("cmd/dev/basecamp/goto-beat"), 0);
}

/// **VALUE**: Verifies a service dropped without shutdown goes offline through its will.
///
/// **BUG THIS CATCHES**: Would catch a crashed display being shown as online.
#[tokio::test]
async fn given_running_service_when_dropped_then_will_marks_offline() {
    // GIVEN
    let broker = MemoryBroker::new();
    let docent = memory_client(&broker, "docent-1");
    let monitor = AvailabilityMonitor::new(
        docent.clone(),
        Topics::new("dev"),
        vec![String::from("basecamp")],
    );
    monitor.attach();
    docent.connect();
    connected(&docent).await;

    let service = display_service(&broker);
    service.start();
    connected(service.client()).await;
    eventually("online seen", || {
        monitor.status("basecamp") == Some(AvailabilityStatus::Online)
    })
    .await;

    // WHEN
    drop(service);

    // THEN
    eventually("offline seen", || {
        monitor.status("basecamp") == Some(AvailabilityStatus::Offline)
    })
    .await;
}

/// **VALUE**: Verifies both hooks report their state after connecting.
///
/// **WHY THIS MATTERS**: A docent that joins late must see where each display is.
#[tokio::test]
async fn given_service_when_connected_then_volume_and_beat_reported_retained() {
    // GIVEN
    let broker = MemoryBroker::new();
    let service = display_service(&broker);

    // WHEN
    service.start();
    connected(service.client()).await;

    // THEN
    eventually("beat report", || {
        broker.retained("state/dev/basecamp/goto-beat").is_some()
    })
    .await;
    eventually("volume report", || {
        broker.retained("state/dev/basecamp/set-volume").is_some()
    })
    .await;

    let late = memory_client(&broker, "docent-1");
    let beats = collect(&late, "state/dev/basecamp/goto-beat");
    let volumes = collect(&late, "state/dev/basecamp/set-volume");
    late.connect();
    connected(&late).await;
    eventually("retained delivered", || {
        beats.lock().unwrap().len() == 1 && volumes.lock().unwrap().len() == 1
    })
    .await;
    assert_eq!(bodies(&beats), [json!({ "beat-id": "welcome-1" })]);
    assert_eq!(
        bodies(&volumes),
        [json!({ "volume-level": 1.0, "volume-muted": false })]
    );
    service.shutdown().await;
}

/// **VALUE**: Verifies conflicting goto commands resolve by envelope order, not arrival order.
///
/// **BUG THIS CATCHES**: Would catch two docents leaving displays on different beats
/// depending on network timing.
#[tokio::test]
async fn given_newer_command_applied_when_older_arrives_then_ignored_and_current_reported() {
    // GIVEN
    let broker = MemoryBroker::new();
    let service = display_service(&broker);
    service.start();
    connected(service.client()).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;

    let observer = memory_client(&broker, "docent-1");
    let reports = collect(&observer, "state/dev/basecamp/goto-beat");
    observer.connect();
    connected(&observer).await;
    eventually("initial report", || !reports.lock().unwrap().is_empty()).await;
    reports.lock().unwrap().clear();

    let now = SystemTime::now();
    let newer = make_envelope_at(
        "docent-a",
        GotoBeatBody {
            beat_id: String::from("problem-1"),
        },
        now,
    );
    let older = make_envelope_at(
        "docent-b",
        GotoBeatBody {
            beat_id: String::from("welcome-2"),
        },
        now - Duration::from_secs(1),
    );

    // WHEN
    observer.publish("cmd/dev/basecamp/goto-beat", &newer);
    eventually("newer applied", || reports.lock().unwrap().len() == 1).await;
    observer.publish("cmd/dev/basecamp/goto-beat", &older);

    // THEN
    eventually("stale re-report", || reports.lock().unwrap().len() == 2).await;
    assert_eq!(
        bodies(&reports),
        [
            json!({ "beat-id": "problem-1" }),
            json!({ "beat-id": "problem-1" })
        ]
    );
    let hook = service.beat_hook().unwrap();
    assert_eq!(hook.current().beat_id(), "problem-1");
    service.shutdown().await;
}

/// **VALUE**: Verifies an empty goto-beat body is ignored and nothing is reported.
#[tokio::test]
async fn given_goto_without_beat_id_when_received_then_ignored() {
    // GIVEN
    let broker = MemoryBroker::new();
    let service = display_service(&broker);
    service.start();
    connected(service.client()).await;
    eventually("display subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;
    let observer = memory_client(&broker, "docent-1");
    let reports = collect(&observer, "state/dev/basecamp/goto-beat");
    observer.connect();
    connected(&observer).await;
    eventually("initial report", || !reports.lock().unwrap().is_empty()).await;
    reports.lock().unwrap().clear();

    // WHEN
    broker.inject(
        "cmd/dev/basecamp/goto-beat",
        &envelope_payload("docent-1", json!({})),
        false,
    );
    tokio::time::sleep(QUIET).await;

    // THEN
    assert!(reports.lock().unwrap().is_empty());
    assert_eq!(
        service.beat_hook().unwrap().current().beat_id(),
        "welcome-1"
    );
    service.shutdown().await;
}

/// **VALUE**: Verifies rebinding moves hooks to the new client and retires the old identity.
#[tokio::test]
async fn given_running_service_when_rebound_then_new_client_serves_commands() {
    // GIVEN
    let broker = MemoryBroker::new();
    let mut service = display_service(&broker);
    service.start();
    connected(service.client()).await;

    // WHEN
    service
        .rebind(memory_client(&broker, "basecamp-2"))
        .await
        .unwrap();
    connected(service.client()).await;
    eventually("old session closed", || broker.session_count() == 1).await;
    eventually("resubscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
    })
    .await;
    broker.inject(
        "cmd/dev/basecamp/goto-beat",
        &envelope_payload("docent-1", json!({ "beat-id": "welcome-3" })),
        false,
    );

    // THEN
    assert_eq!(service.client().device_id(), "basecamp-2");
    eventually("command applied", || {
        service.beat_hook().unwrap().current().beat_id() == "welcome-3"
    })
    .await;
    service.shutdown().await;
}
