use crate::error::navigation::NavigationError;
use crate::navigation::navigator::{Navigator, Transition, resolve_beat_id};
use crate::tests::welcome_problem;

use models::{NavigationState, SequenceBuilder};

use std::sync::Arc;

fn at(moment_id: &str, beat_idx: usize) -> Navigator {
    let sequence = welcome_problem();
    let state = NavigationState::within(&sequence, moment_id, beat_idx).unwrap();
    Navigator::with_state(sequence, &state).unwrap()
}

/// **VALUE**: Verifies a fresh navigator starts at the first beat of the first moment.
#[test]
fn given_new_navigator_when_created_then_at_first_beat() {
    let navigator = Navigator::new(welcome_problem()).unwrap();

    assert_eq!(navigator.current_beat_id(), "welcome-1");
    assert_eq!(navigator.position(), (0, 0));
    assert!(navigator.is_previous_disabled());
    assert!(!navigator.is_next_disabled());
}

/// **VALUE**: Verifies `next` at the last beat of a moment moves to the next moment's first beat.
///
/// **WHY THIS MATTERS**: This is the moment boundary the docent crosses every tour.
#[test]
fn given_last_beat_of_welcome_when_next_then_first_beat_of_problem() {
    // GIVEN
    let mut navigator = at("welcome", 2);

    // WHEN
    let transition = navigator.next();

    // THEN
    assert!(transition.is_moved());
    assert_eq!(navigator.state().moment_id(), "problem");
    assert_eq!(navigator.state().beat_idx(), 0);
    assert_eq!(navigator.current_beat_id(), "problem-1");
    assert_eq!(navigator.position(), (1, 0));
}

/// **VALUE**: Verifies `previous` at a moment's first beat lands on the previous moment's LAST beat.
///
/// **BUG THIS CATCHES**: Would catch `previous` resetting to beat 0 of the earlier moment.
#[test]
fn given_first_beat_of_problem_when_previous_then_last_beat_of_welcome() {
    let mut navigator = at("problem", 0);

    let transition = navigator.previous();

    match transition {
        Transition::Moved { from, to } => {
            assert_eq!(from.beat_id(), "problem-1");
            assert_eq!(to.beat_id(), "welcome-3");
        }
        Transition::Disabled => panic!("previous should have moved"),
    }
    assert_eq!(navigator.state().beat_idx(), 2);
}

/// **VALUE**: Verifies `previous` within a moment steps back exactly one beat.
#[test]
fn given_mid_moment_when_previous_then_beat_decreases_by_one() {
    let mut navigator = at("welcome", 2);

    navigator.previous();

    assert_eq!(navigator.state().moment_id(), "welcome");
    assert_eq!(navigator.state().beat_idx(), 1);
}

/// **VALUE**: Verifies there is no wraparound at either end.
///
/// **WHY THIS MATTERS**: The UI disables controls from these flags; a wrap would jump the
/// whole room back to the welcome screen mid-tour.
#[test]
fn given_sequence_ends_when_stepping_outward_then_disabled_and_unchanged() {
    // GIVEN: first beat
    let mut navigator = Navigator::new(welcome_problem()).unwrap();

    // WHEN/THEN: previous is a no-op
    assert_eq!(navigator.previous(), Transition::Disabled);
    assert_eq!(navigator.current_beat_id(), "welcome-1");

    // GIVEN: last beat
    let mut navigator = at("problem", 1);

    // WHEN/THEN: next is a no-op
    assert!(navigator.is_next_disabled());
    assert_eq!(navigator.next(), Transition::Disabled);
    assert_eq!(navigator.current_beat_id(), "problem-2");
}

/// **VALUE**: Verifies walking the whole sequence visits every beat in order.
#[test]
fn given_first_beat_when_next_repeatedly_then_visits_every_beat() {
    let mut navigator = Navigator::new(welcome_problem()).unwrap();
    let mut visited = vec![navigator.current_beat_id()];

    while navigator.next().is_moved() {
        visited.push(navigator.current_beat_id());
    }

    assert_eq!(
        visited,
        ["welcome-1", "welcome-2", "welcome-3", "problem-1", "problem-2"]
    );
    assert_eq!(navigator.progress(), (4, 5));
}

/// **VALUE**: Verifies goto to an out-of-range beat fails and leaves the state alone.
#[test]
fn given_out_of_range_target_when_goto_then_error_and_state_unchanged() {
    let mut navigator = at("welcome", 1);

    let result = navigator.goto("problem", 2);

    assert!(matches!(result, Err(NavigationError::InvalidTarget { .. })));
    assert_eq!(navigator.current_beat_id(), "welcome-2");
}

/// **VALUE**: Verifies wire beat ids drive goto, including moment ids containing dashes.
#[test]
fn given_dashed_moment_id_when_goto_beat_id_then_resolves_last_ordinal() {
    let sequence = Arc::new(
        SequenceBuilder::default()
            .with_moment("pre-show", "Pre-show", 2)
            .with_moment("main", "Main", 1)
            .build()
            .unwrap(),
    );
    let mut navigator = Navigator::new(sequence).unwrap();

    let transition = navigator.goto_beat_id("pre-show-2").unwrap();

    assert_eq!(transition.target().map(|s| s.beat_idx()), Some(1));
    assert_eq!(navigator.state().moment_id(), "pre-show");
}

/// **VALUE**: Verifies CMS-provided handles resolve before the ordinal form.
#[test]
fn given_custom_handle_when_resolved_then_maps_to_its_beat() {
    let sequence = SequenceBuilder::default()
        .with_moment_handles(
            "summit",
            "Summit",
            vec![None, Some(String::from("summit-finale"))],
        )
        .build()
        .unwrap();

    let state = resolve_beat_id(&sequence, "summit-finale").unwrap();

    assert_eq!(state.beat_idx(), 1);
}

/// **VALUE**: Verifies every id the navigator publishes resolves back to the same beat on a
/// display whose content carries CMS handles.
///
/// **WHY THIS MATTERS**: The docent publishes `current_beat_id()` and each display resolves it
/// against its own copy of the content. Handles are aliases only; they must never redirect a
/// published id to another beat.
///
/// **BUG THIS CATCHES**: Would catch handles being matched before the `<moment>-<ordinal>` form
/// and sending displays to a different beat than the docent.
#[test]
fn given_cms_handles_when_published_ids_resolved_then_same_beat_everywhere() {
    // GIVEN: Content where most beats carry custom handles
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
    let mut navigator = Navigator::new(Arc::clone(&sequence)).unwrap();

    // WHEN/THEN: Every published id lands on the navigator's own state
    loop {
        let wire = navigator.current_beat_id();
        let resolved = resolve_beat_id(&sequence, &wire).unwrap();
        assert_eq!(&resolved, navigator.state(), "wire id {wire} resolved elsewhere");

        if !navigator.next().is_moved() {
            break;
        }
    }
    assert_eq!(navigator.current_beat_id(), "problem-2");

    // AND: Handles still work as aliases
    let alias = resolve_beat_id(&sequence, "overview").unwrap();
    assert_eq!((alias.moment_id(), alias.beat_idx()), ("welcome", 1));
}

/// **VALUE**: Verifies unknown beat ids are invalid targets.
#[test]
fn given_unknown_beat_id_when_resolved_then_invalid_target() {
    let sequence = welcome_problem();

    assert!(resolve_beat_id(&sequence, "summit-1").is_err());
    assert!(resolve_beat_id(&sequence, "welcome-0").is_err());
    assert!(resolve_beat_id(&sequence, "welcome").is_err());
}
