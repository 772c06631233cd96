use crate::{ModelError, format_beat_id, parse_beat_id};

/// **VALUE**: Verifies the 0-based index to 1-based ordinal conversion on the wire.
///
/// **WHY THIS MATTERS**: The docent tablet and displays only agree on position through
/// the beat id string. An off-by-one here sends every display one beat ahead.
///
/// **BUG THIS CATCHES**: Would catch formatting the raw index instead of the ordinal.
#[test]
fn given_moment_and_index_when_formatted_then_uses_one_based_ordinal() {
    // GIVEN/WHEN: Formatting the first and third beats
    let first = format_beat_id("welcome", 0);
    let third = format_beat_id("welcome", 2);

    // THEN: Ordinals are 1-based
    assert_eq!(first, "welcome-1");
    assert_eq!(third, "welcome-3");
}

/// **VALUE**: Verifies that parse(format(x)) == x across tricky moment ids.
///
/// **WHY THIS MATTERS**: Moment ids come from the CMS and regularly contain dashes and
/// digits ("act-2", "q-and-a"). The parser must only split off the final ordinal.
///
/// **BUG THIS CATCHES**: Would catch a non-greedy or split-on-first-dash parser.
#[test]
fn given_valid_pairs_when_formatted_and_parsed_then_round_trips() {
    // GIVEN: Moment ids with dashes and digits
    let cases = [
        ("welcome", 0usize),
        ("problem", 1),
        ("act-2", 4),
        ("q-and-a", 11),
        ("2024", 0),
    ];

    for (moment_id, beat_idx) in cases {
        // WHEN: Formatting then parsing
        let parsed = parse_beat_id(&format_beat_id(moment_id, beat_idx)).unwrap();

        // THEN: The original pair comes back
        assert_eq!(parsed, (moment_id.to_string(), beat_idx));
    }
}

/// **VALUE**: Verifies malformed beat ids are rejected with a BeatId error.
///
/// **WHY THIS MATTERS**: Beat ids arrive from the network. A garbage id must become an
/// error the sync hook can log, not a panic or a silent jump to beat 0.
///
/// **BUG THIS CATCHES**: Would catch accepting ordinal 0 (which would underflow to
/// `usize::MAX`), missing suffixes or empty moment parts.
#[test]
fn given_malformed_ids_when_parsed_then_returns_beat_id_error() {
    // GIVEN: Malformed ids
    let cases = ["welcome", "welcome-", "-3", "welcome-0", "", "welcome-x"];

    for beat_id in cases {
        // WHEN: Parsing
        let result = parse_beat_id(beat_id);

        // THEN: BeatId error carrying the offending id
        match result {
            Err(ModelError::BeatId { beat_id: got, .. }) => assert_eq!(got, beat_id),
            other => panic!("expected BeatId error for {beat_id:?}, got {other:?}"),
        }
    }
}

/// **VALUE**: Verifies an ordinal too large for usize is an error, not a panic.
#[test]
fn given_overflowing_ordinal_when_parsed_then_returns_error() {
    // GIVEN: An absurdly large ordinal
    let beat_id = "welcome-99999999999999999999999999";

    // WHEN/THEN: Error, no panic
    assert!(parse_beat_id(beat_id).is_err());
}
