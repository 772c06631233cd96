use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures the calling file and line.
///
/// **WHY THIS MATTERS**: Every transport, protocol and config error in the workspace carries
/// an ErrorLocation. When a display drops off the broker at 2am, the log line is the only
/// clue to which code path failed.
///
/// **BUG THIS CATCHES**: Would catch if location capture stops pointing at the call site.
#[test]
fn given_caller_location_when_error_location_created_then_matches_call_site() {
    // GIVEN: The line we capture on
    let expected_line = line!() + 3;

    // WHEN: Creating ErrorLocation from the caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: File and line point here
    assert!(location.file.ends_with("error_location.rs"));
    assert_eq!(location.line, expected_line);
    assert!(location.column > 0);
}

/// **VALUE**: Verifies the bracketed `[file:line:column]` Display format.
///
/// **BUG THIS CATCHES**: Would catch Display changes that make log lines unparseable
/// by the grep patterns operators use on `kiosk.log`.
#[test]
fn given_error_location_when_displayed_then_uses_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "transport/client.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: Exact bracketed format
    assert_eq!(formatted, "[transport/client.rs:42:7]");
}

/// **VALUE**: Verifies that `#[track_caller]` constructors report their caller, not themselves.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[track_caller]` on error helper
/// constructors, which would make every error point at the helper.
#[test]
fn given_track_caller_helper_when_called_twice_then_lines_differ() {
    // GIVEN: A helper that captures its caller
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Calling from consecutive lines
    let first = capture();
    let second = capture();

    // THEN: Same file, consecutive lines
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line);
}
