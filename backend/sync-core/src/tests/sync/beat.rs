use crate::protocol::topics::Topics;
use crate::sync::beat::{BeatHook, BeatOutcome};
use crate::sync::state_access::{SharedState, StateAccess};
use crate::tests::welcome_problem;

use models::{GotoBeatBody, Meta, NavigationState};

use std::sync::Arc;

fn hook() -> (BeatHook, SharedState<NavigationState>) {
    let sequence = welcome_problem();
    let state = SharedState::new(sequence.first_state().unwrap());
    let hook = BeatHook::new("overlook", Topics::new("dev"), sequence, Arc::new(state.clone()));
    (hook, state)
}

fn meta(source: &str, ts: &str) -> Meta {
    Meta {
        id: format!("{source}-{ts}"),
        ts: ts.to_string(),
        source: source.to_string(),
    }
}

fn goto(beat_id: &str) -> GotoBeatBody {
    GotoBeatBody {
        beat_id: beat_id.to_string(),
    }
}

/// **VALUE**: Verifies a fresh goto-beat is applied to the display state.
#[test]
fn given_fresh_command_when_applied_then_state_moves() {
    let (hook, state) = hook();

    let outcome = hook.apply(&meta("docent-a", "2024-05-01T10:00:00.000Z"), &goto("problem-1"));

    assert!(matches!(outcome, BeatOutcome::Applied(_)));
    assert_eq!(state.get().beat_id(), "problem-1");
}

/// **VALUE**: Verifies an older command arriving late does not override a newer one.
///
/// **WHY THIS MATTERS**: Two docents tapping at once must converge every display on the
/// same beat regardless of arrival order.
///
/// **BUG THIS CATCHES**: Would catch last-arrival-wins, which leaves displays split.
#[test]
fn given_newer_command_applied_when_older_arrives_then_stale_and_unchanged() {
    // GIVEN: The newer command lands first
    let (hook, state) = hook();
    hook.apply(&meta("docent-b", "2024-05-01T10:00:00.500Z"), &goto("welcome-3"));

    // WHEN: The older one arrives
    let outcome = hook.apply(&meta("docent-a", "2024-05-01T10:00:00.100Z"), &goto("problem-2"));

    // THEN
    assert_eq!(outcome.state().beat_id(), "welcome-3");
    assert!(matches!(outcome, BeatOutcome::Stale(_)));
    assert_eq!(state.get().beat_id(), "welcome-3");
}

/// **VALUE**: Verifies a replayed command (same key) is stale.
#[test]
fn given_same_command_twice_when_applied_then_second_is_stale() {
    let (hook, _) = hook();
    let meta = meta("docent-a", "2024-05-01T10:00:00.000Z");

    hook.apply(&meta, &goto("welcome-2"));
    let outcome = hook.apply(&meta, &goto("welcome-2"));

    assert!(matches!(outcome, BeatOutcome::Stale(_)));
}

/// **VALUE**: Verifies an unresolvable beat is rejected without consuming the ordering slot.
///
/// **BUG THIS CATCHES**: Would catch a bad command from a newer clock blocking every
/// legitimate command after it.
#[test]
fn given_unknown_beat_when_applied_then_rejected_and_later_commands_still_apply() {
    // GIVEN
    let (hook, state) = hook();

    // WHEN
    let rejected = hook.apply(&meta("docent-a", "2024-05-01T10:00:09.000Z"), &goto("summit-1"));
    let applied = hook.apply(&meta("docent-a", "2024-05-01T10:00:01.000Z"), &goto("welcome-2"));

    // THEN
    assert!(matches!(rejected, BeatOutcome::Rejected(_)));
    assert!(matches!(applied, BeatOutcome::Applied(_)));
    assert_eq!(state.get().beat_id(), "welcome-2");
}

/// **VALUE**: Verifies an unparseable timestamp is rejected.
#[test]
fn given_invalid_timestamp_when_applied_then_rejected() {
    let (hook, state) = hook();

    let outcome = hook.apply(&meta("docent-a", "not-a-time"), &goto("problem-1"));

    assert!(matches!(outcome, BeatOutcome::Rejected(_)));
    assert_eq!(state.get().beat_id(), "welcome-1");
}
