//! Docent console commands.
//!
//! One command per line, whitespace separated, case-insensitive keyword:
//!
//! ```text
//! next | prev | goto <beat-id> | volume <0..1> | mute | unmute | status | help | quit
//! ```

use crate::error::KioskError;

pub const HELP: &str = "commands: next, prev, goto <beat-id>, volume <0..1>, mute, unmute, status, help, quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Next,
    Previous,
    Goto(String),
    Volume(f64),
    Mute,
    Unmute,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`KioskError::Console`] for unknown keywords, missing or extra
    /// arguments, and volume levels outside `0..=1`.
    #[track_caller]
    pub fn parse(line: &str) -> Result<Option<Self>, KioskError> {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();
        if let Some(extra) = words.next() {
            return Err(KioskError::console(format!("unexpected argument '{extra}'")));
        }

        let command = match (keyword.to_ascii_lowercase().as_str(), argument) {
            ("next" | "n", None) => ConsoleCommand::Next,
            ("prev" | "previous" | "p", None) => ConsoleCommand::Previous,
            ("goto" | "g", Some(beat_id)) => ConsoleCommand::Goto(beat_id.to_string()),
            ("goto" | "g", None) => return Err(KioskError::console("goto needs a beat id")),
            ("volume" | "vol", Some(level)) => ConsoleCommand::Volume(parse_level(level)?),
            ("volume" | "vol", None) => return Err(KioskError::console("volume needs a level")),
            ("mute", None) => ConsoleCommand::Mute,
            ("unmute", None) => ConsoleCommand::Unmute,
            ("status" | "s", None) => ConsoleCommand::Status,
            ("help" | "?", None) => ConsoleCommand::Help,
            ("quit" | "exit" | "q", None) => ConsoleCommand::Quit,
            (keyword, Some(argument)) if is_keyword(keyword) => {
                return Err(KioskError::console(format!(
                    "{keyword} takes no argument (got '{argument}')"
                )));
            }
            (keyword, _) => {
                return Err(KioskError::console(format!("unknown command '{keyword}'")));
            }
        };

        Ok(Some(command))
    }
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "next" | "n" | "prev" | "previous" | "p" | "mute" | "unmute" | "status" | "s" | "help"
            | "?" | "quit" | "exit" | "q"
    )
}

#[track_caller]
fn parse_level(level: &str) -> Result<f64, KioskError> {
    let value: f64 = level
        .parse()
        .map_err(|_| KioskError::console(format!("'{level}' is not a number")))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(KioskError::console(format!(
            "volume level must be between 0 and 1 (got {value})"
        )));
    }

    Ok(value)
}
