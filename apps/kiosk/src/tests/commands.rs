use crate::commands::ConsoleCommand;
use crate::error::KioskError;

fn parse(line: &str) -> Option<ConsoleCommand> {
    ConsoleCommand::parse(line).unwrap()
}

fn error_message(line: &str) -> String {
    match ConsoleCommand::parse(line) {
        Err(KioskError::Console { message, .. }) => message,
        other => panic!("expected a console error for {line:?}, got {other:?}"),
    }
}

/// **VALUE**: Verifies every console keyword and its short form.
#[test]
fn given_keywords_when_parsed_then_commands() {
    assert_eq!(parse("next"), Some(ConsoleCommand::Next));
    assert_eq!(parse("N"), Some(ConsoleCommand::Next));
    assert_eq!(parse("prev"), Some(ConsoleCommand::Previous));
    assert_eq!(parse("  goto   problem-2 "), Some(ConsoleCommand::Goto(String::from("problem-2"))));
    assert_eq!(parse("volume 0.4"), Some(ConsoleCommand::Volume(0.4)));
    assert_eq!(parse("mute"), Some(ConsoleCommand::Mute));
    assert_eq!(parse("unmute"), Some(ConsoleCommand::Unmute));
    assert_eq!(parse("status"), Some(ConsoleCommand::Status));
    assert_eq!(parse("?"), Some(ConsoleCommand::Help));
    assert_eq!(parse("QUIT"), Some(ConsoleCommand::Quit));
}

/// **VALUE**: Verifies blank lines are not commands and not errors.
#[test]
fn given_blank_line_when_parsed_then_none() {
    assert_eq!(parse(""), None);
    assert_eq!(parse("   \t"), None);
}

/// **VALUE**: Verifies the beat id keeps its case.
///
/// **BUG THIS CATCHES**: Would catch lowercasing the whole line, which breaks CMS handles
/// like `Intro-Video`.
#[test]
fn given_mixed_case_beat_id_when_parsed_then_case_kept() {
    assert_eq!(
        parse("GOTO Intro-Video"),
        Some(ConsoleCommand::Goto(String::from("Intro-Video")))
    );
}

/// **VALUE**: Verifies malformed lines are console errors with a readable reason.
///
/// **WHY THIS MATTERS**: A typo on the docent tablet must not move or mute the room.
#[test]
fn given_malformed_lines_when_parsed_then_console_errors() {
    assert_eq!(error_message("jump"), "unknown command 'jump'");
    assert_eq!(error_message("goto"), "goto needs a beat id");
    assert_eq!(error_message("volume"), "volume needs a level");
    assert_eq!(error_message("volume loud"), "'loud' is not a number");
    assert!(error_message("volume 1.5").contains("between 0 and 1"));
    assert!(error_message("volume NaN").contains("between 0 and 1"));
    assert_eq!(error_message("next 2"), "next takes no argument (got '2')");
    assert_eq!(error_message("goto a b"), "unexpected argument 'b'");
}
