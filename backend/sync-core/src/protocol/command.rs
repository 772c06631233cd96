//! Typed commands decoded from envelope bodies.

use crate::error::protocol::ProtocolError;
use crate::protocol::envelope::parse_envelope;
use crate::protocol::topics::{AVAILABILITY, GOTO_BEAT, SET_VOLUME};

use models::{AvailabilityStatus, GotoBeatBody, Meta, SetVolumeBody};

use serde_json::Value;

/// Every command kind the sync layer understands.
///
/// Decoding only looks at recognized fields; anything else in the body is
/// ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GotoBeat(GotoBeatBody),
    SetVolume(SetVolumeBody),
    Availability(AvailabilityStatus),
    /// A known command whose body carries none of its fields. Applying it is
    /// a no-op.
    Empty { name: String },
    Unknown { name: String },
}

impl Command {
    /// Decode `body` as the command called `name` (the last topic segment).
    pub fn decode(name: &str, body: &Value) -> Command {
        match name {
            GOTO_BEAT => match body.get("beat-id").and_then(Value::as_str) {
                Some(beat_id) => Command::GotoBeat(GotoBeatBody {
                    beat_id: beat_id.to_string(),
                }),
                None => Command::empty(name),
            },
            SET_VOLUME => {
                let update = SetVolumeBody {
                    level: body.get("volume-level").and_then(Value::as_f64),
                    muted: body.get("volume-muted").and_then(Value::as_bool),
                };
                if update.is_empty() {
                    Command::empty(name)
                } else {
                    Command::SetVolume(update)
                }
            }
            AVAILABILITY => match body.get("status").and_then(Value::as_str) {
                Some(status) => match AvailabilityStatus::parse(status) {
                    Some(status) => Command::Availability(status),
                    None => Command::Unknown {
                        name: name.to_string(),
                    },
                },
                None => Command::empty(name),
            },
            _ => Command::Unknown {
                name: name.to_string(),
            },
        }
    }

    fn empty(name: &str) -> Command {
        Command::Empty {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Command::GotoBeat(_) => GOTO_BEAT,
            Command::SetVolume(_) => SET_VOLUME,
            Command::Availability(_) => AVAILABILITY,
            Command::Empty { name } | Command::Unknown { name } => name,
        }
    }
}

/// Parse a raw payload published on a topic ending in `name`.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if the payload is not an envelope.
pub fn decode_command(name: &str, payload: &str) -> Result<(Meta, Command), ProtocolError> {
    let (meta, body) = parse_envelope(payload)?.into_parts();
    let command = Command::decode(name, &body);
    Ok((meta, command))
}
