use kiosk::commands::ConsoleCommand;
use kiosk::session::{ConsoleReply, DocentSession};

use sync_core::broker::MemoryBroker;
use sync_core::navigation::NavigationController;
use sync_core::protocol::Topics;
use sync_core::sync::{
    AvailabilityMonitor, LoggingAudioEngine, SharedState, StateAccess, SyncService,
};
use sync_core::transport::{ClientCallbacks, MessageClient, ReconnectPolicy};

use models::{Sequence, SequenceBuilder, VolumeState};

use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(3);

fn sequence() -> Arc<Sequence> {
    Arc::new(
        SequenceBuilder::default()
            .with_moment("welcome", "Welcome", 3)
            .with_moment("problem", "The Problem", 2)
            .build()
            .unwrap(),
    )
}

fn client(broker: &MemoryBroker, device_id: &str) -> MessageClient {
    MessageClient::new(
        device_id,
        Arc::new(broker.clone()),
        ClientCallbacks::new(),
        ReconnectPolicy {
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(50),
            multiplier: 2.0,
        },
    )
}

async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for: {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

struct Exhibit {
    service: SyncService,
    volume: SharedState<VolumeState>,
}

async fn display(broker: &MemoryBroker, exhibit: &str) -> Exhibit {
    let sequence = sequence();
    let volume = SharedState::new(VolumeState::default());
    let service = SyncService::new(
        client(broker, &format!("{exhibit}-1")),
        Topics::new("dev"),
        exhibit,
    )
    .unwrap()
    .with_volume(Arc::new(volume.clone()), Arc::new(LoggingAudioEngine))
    .with_beat(
        Arc::clone(&sequence),
        Arc::new(SharedState::new(sequence.first_state().unwrap())),
    );
    service.start();
    tokio::time::timeout(WAIT, service.client().wait_for_connection(true))
        .await
        .unwrap();
    Exhibit { service, volume }
}

async fn docent(broker: &MemoryBroker, targets: &[&str]) -> DocentSession {
    let client = client(broker, "docent-1");
    let topics = Topics::new("dev");
    let targets: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
    let session = DocentSession::new(
        NavigationController::new(client.clone(), topics.clone(), targets.clone(), sequence())
            .unwrap(),
        AvailabilityMonitor::new(client.clone(), topics, targets),
    );
    client.connect();
    tokio::time::timeout(WAIT, client.wait_for_connection(true))
        .await
        .unwrap();
    session
}

/// **VALUE**: Verifies a scripted console session drives the displays end to end.
///
/// **WHY THIS MATTERS**: This is the docent's whole job: step through the tour and set the
/// room volume from one place.
#[tokio::test]
async fn given_console_script_when_run_then_displays_follow_and_quit_stops_reading() {
    // GIVEN
    let broker = MemoryBroker::new();
    let basecamp = display(&broker, "basecamp").await;
    let summit = display(&broker, "summit").await;
    let session = docent(&broker, &["basecamp", "summit"]).await;
    eventually("displays subscribed", || {
        broker.subscriber_count("cmd/dev/basecamp/goto-beat") == 1
            && broker.subscriber_count("cmd/dev/summit/set-volume") == 1
    })
    .await;
    let script = "next\n\ngoto problem-2\nvolume 0.25\nmute\njump\nquit\nprev\n";
    let mut output = Vec::new();

    // WHEN
    session
        .run_console(script.as_bytes(), &mut output)
        .await
        .unwrap();

    // THEN
    let output = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[1], "now at welcome-2 (2/5)");
    assert_eq!(lines[2], "now at problem-2 (5/5)");
    assert_eq!(lines[3], "volume update sent to 2 of 2 exhibits");
    assert_eq!(lines[5], "error: unknown command 'jump'");
    assert_eq!(lines.len(), 6, "nothing after quit: {output}");

    for exhibit in [&basecamp, &summit] {
        let hook = exhibit.service.beat_hook().unwrap();
        eventually("beat applied", || hook.current().beat_id() == "problem-2").await;
        eventually("volume applied", || {
            exhibit.volume.get()
                == VolumeState {
                    level: 0.25,
                    muted: true,
                }
        })
        .await;
    }
    eventually("confirmed", || session.controller().is_synchronized()).await;

    basecamp.service.shutdown().await;
    summit.service.shutdown().await;
}

/// **VALUE**: Verifies status lists each target's availability and last reported beat.
#[tokio::test]
async fn given_one_display_online_when_status_then_each_target_listed() {
    // GIVEN
    let broker = MemoryBroker::new();
    let basecamp = display(&broker, "basecamp").await;
    let session = docent(&broker, &["basecamp", "overlook"]).await;
    eventually("basecamp online", || session.availability().status("basecamp").is_some()).await;
    eventually("basecamp report", || {
        session.controller().confirmed_beat("basecamp").is_some()
    })
    .await;

    // WHEN
    let reply = session.execute(ConsoleCommand::Status);

    // THEN
    let ConsoleReply::Continue(text) = reply else {
        panic!("status must not quit");
    };
    assert_eq!(
        text,
        "at welcome-1 (1/5), waiting for exhibits\n  basecamp: online, welcome-1\n  overlook: unknown, no report"
    );
    basecamp.service.shutdown().await;
}

/// **VALUE**: Verifies moving past the end is reported, not sent.
#[tokio::test]
async fn given_first_beat_when_prev_then_already_at_first_beat() {
    // GIVEN
    let broker = MemoryBroker::new();
    let session = docent(&broker, &["basecamp"]).await;

    // WHEN
    let reply = session.execute(ConsoleCommand::Previous);

    // THEN
    assert_eq!(
        reply,
        ConsoleReply::Continue(String::from("already at the first beat"))
    );
    assert_eq!(
        session.execute(ConsoleCommand::Goto(String::from("nowhere-1"))),
        ConsoleReply::Continue(String::from("no beat 'nowhere-1' in this sequence"))
    );
}
