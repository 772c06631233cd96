use crate::{ModelError, SequenceBuilder};

/// **VALUE**: Verifies default handles are the formatted wire beat ids.
///
/// **WHY THIS MATTERS**: Static fallback content usually omits handles. The displays must
/// still agree with the docent on "welcome-3" meaning the third welcome beat.
#[test]
fn given_moment_without_handles_when_built_then_handles_are_wire_ids() {
    // GIVEN/WHEN: A moment with three default beats
    let sequence = SequenceBuilder::default()
        .with_moment("welcome", "Welcome", 3)
        .build()
        .unwrap();

    // THEN: Handles and ordinals line up
    let moment = sequence.find("welcome").unwrap();
    let handles: Vec<&str> = moment.beats().iter().map(|b| b.handle()).collect();
    assert_eq!(handles, ["welcome-1", "welcome-2", "welcome-3"]);
    assert_eq!(moment.beat(2).unwrap().ordinal(), 2);
}

/// **VALUE**: Verifies moments with zero beats are refused.
///
/// **WHY THIS MATTERS**: A zero-beat moment has no valid navigation state; letting one into
/// the sequence would make `next` land on an impossible position.
///
/// **BUG THIS CATCHES**: Would catch the builder accepting CMS moments with empty beat lists.
#[test]
fn given_zero_beat_moment_when_built_then_returns_empty_moment_error() {
    // GIVEN: A sequence containing an empty moment
    let result = SequenceBuilder::default()
        .with_moment("welcome", "Welcome", 3)
        .with_moment("intermission", "Intermission", 0)
        .build();

    // THEN: EmptyMoment naming the offender
    match result {
        Err(ModelError::EmptyMoment { moment_id, .. }) => assert_eq!(moment_id, "intermission"),
        other => panic!("expected EmptyMoment, got {other:?}"),
    }
}

/// **VALUE**: Verifies duplicate moment ids are rejected.
///
/// **BUG THIS CATCHES**: Would catch lookups by id silently resolving to the first of two
/// same-named moments.
#[test]
fn given_duplicate_moment_ids_when_built_then_returns_validation_error() {
    let result = SequenceBuilder::default()
        .with_moment("welcome", "Welcome", 1)
        .with_moment("welcome", "Welcome again", 1)
        .build();

    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Duplicate moment id: welcome")
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

/// **VALUE**: Verifies an empty sequence is rejected.
#[test]
fn given_no_moments_when_built_then_returns_validation_error() {
    let result = SequenceBuilder::default().build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

/// **VALUE**: Verifies explicit CMS handles are kept and blank titles fall back to the id.
#[test]
fn given_custom_handles_and_blank_title_when_built_then_kept_and_defaulted() {
    // GIVEN: One custom handle, one default, and a blank title
    let sequence = SequenceBuilder::default()
        .with_moment_handles(
            "summit",
            "  ",
            vec![Some(String::from("summit-intro")), None],
        )
        .build()
        .unwrap();

    // THEN: Custom handle kept, second defaulted, title falls back
    let moment = sequence.find("summit").unwrap();
    assert_eq!(moment.beats()[0].handle(), "summit-intro");
    assert_eq!(moment.beats()[1].handle(), "summit-2");
    assert_eq!(moment.title(), "summit");
}

/// **VALUE**: Verifies duplicate beat handles across moments are rejected.
#[test]
fn given_colliding_handles_when_built_then_returns_validation_error() {
    let result = SequenceBuilder::default()
        .with_moment_handles("a", "A", vec![Some(String::from("shared"))])
        .with_moment_handles("b", "B", vec![Some(String::from("shared"))])
        .build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

/// **VALUE**: Verifies a handle may not reuse the wire id of a different beat.
///
/// **WHY THIS MATTERS**: The docent publishes `<moment>-<ordinal>` ids. If `welcome`'s first
/// beat were handled `welcome-2`, a display resolving that id could land one beat early.
///
/// **BUG THIS CATCHES**: Would catch the builder only checking handles against each other.
#[test]
fn given_handle_equal_to_other_beats_wire_id_when_built_then_returns_validation_error() {
    // GIVEN: The first welcome beat handled as the second beat's wire id
    let result = SequenceBuilder::default()
        .with_moment_handles(
            "welcome",
            "Welcome",
            vec![Some(String::from("welcome-2")), Some(String::from("intro"))],
        )
        .build();

    // THEN
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Beat handle 'welcome-2' is the wire id of beat 1 of 'welcome'")
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

/// **VALUE**: Verifies a handle naming a beat of another moment is rejected too.
#[test]
fn given_handle_equal_to_wire_id_in_other_moment_when_built_then_returns_validation_error() {
    let result = SequenceBuilder::default()
        .with_moment_handles("welcome", "Welcome", vec![Some(String::from("problem-1"))])
        .with_moment("problem", "The Problem", 1)
        .build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

/// **VALUE**: Verifies spelling out a beat's own wire id as its handle is allowed.
#[test]
fn given_handle_equal_to_own_wire_id_when_built_then_accepted() {
    let sequence = SequenceBuilder::default()
        .with_moment_handles(
            "welcome",
            "Welcome",
            vec![Some(String::from("welcome-1")), None],
        )
        .build()
        .unwrap();

    assert_eq!(sequence.find("welcome").unwrap().beats()[0].handle(), "welcome-1");
}

/// **VALUE**: Verifies moment ids with control characters are refused.
///
/// **BUG THIS CATCHES**: Would catch an id like `"a\nb"` being accepted even though its
/// formatted wire id `"a\nb-1"` cannot be parsed back.
#[test]
fn given_moment_id_with_newline_when_built_then_returns_validation_error() {
    let result = SequenceBuilder::default()
        .with_moment("a\nb", "Split", 1)
        .build();

    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert!(message.starts_with("Moment id contains control characters"))
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}
