use crate::protocol::topics::Topics;
use crate::sync::state_access::{SharedState, StateAccess};
use crate::sync::volume::VolumeHook;
use crate::tests::sync::RecordingAudio;

use models::{SetVolumeBody, VolumeState};

use std::sync::Arc;

fn hook(initial: VolumeState) -> (VolumeHook, SharedState<VolumeState>, Arc<RecordingAudio>) {
    let state = SharedState::new(initial);
    let audio = Arc::new(RecordingAudio::default());
    let hook = VolumeHook::new(
        "basecamp",
        Topics::new("dev"),
        Arc::new(state.clone()),
        audio.clone(),
    );
    (hook, state, audio)
}

/// **VALUE**: Verifies a level-only update keeps the muted flag and only drives the volume.
///
/// **WHY THIS MATTERS**: The docent's slider sends level alone. Unmuting a muted exhibit
/// because the field was absent would be audible in the room.
#[test]
fn given_muted_exhibit_when_level_only_update_then_stays_muted() {
    // GIVEN
    let (hook, state, audio) = hook(VolumeState {
        level: 1.0,
        muted: true,
    });

    // WHEN
    let merged = hook.apply(&SetVolumeBody {
        level: Some(0.4),
        muted: None,
    });

    // THEN
    assert_eq!(
        merged,
        VolumeState {
            level: 0.4,
            muted: true
        }
    );
    assert_eq!(state.get(), merged);
    assert_eq!(*audio.calls.lock().unwrap(), ["volume 0.4"]);
}

/// **VALUE**: Verifies out-of-range levels pass through unclamped.
#[test]
fn given_level_above_one_when_applied_then_not_clamped() {
    let (hook, _, audio) = hook(VolumeState::default());

    let merged = hook.apply(&SetVolumeBody {
        level: Some(1.5),
        muted: Some(false),
    });

    assert_eq!(merged.level, 1.5);
    assert_eq!(*audio.calls.lock().unwrap(), ["volume 1.5", "muted false"]);
}

/// **VALUE**: Verifies topics are derived from the exhibit.
#[test]
fn given_hook_when_topics_requested_then_command_and_state_families() {
    let (hook, _, _) = hook(VolumeState::default());

    assert_eq!(hook.command_topic(), "cmd/dev/basecamp/set-volume");
    assert_eq!(hook.report_topic(), "state/dev/basecamp/set-volume");
}
