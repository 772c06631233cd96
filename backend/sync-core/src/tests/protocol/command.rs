use crate::error::protocol::ProtocolError;
use crate::protocol::command::{Command, decode_command};
use crate::protocol::envelope::{encode_envelope, make_envelope};
use crate::protocol::topics::{AVAILABILITY, GOTO_BEAT, SET_VOLUME};

use models::{AvailabilityStatus, GotoBeatBody, SetVolumeBody};

use serde_json::json;

/// **VALUE**: Verifies goto-beat decoding ignores unrecognized fields.
#[test]
fn given_goto_beat_with_extra_fields_when_decoded_then_only_beat_id_is_used() {
    let body = json!({"beat-id": "problem-1", "animate": true});

    let command = Command::decode(GOTO_BEAT, &body);

    assert_eq!(
        command,
        Command::GotoBeat(GotoBeatBody {
            beat_id: String::from("problem-1")
        })
    );
}

/// **VALUE**: Verifies volume fields decode independently.
///
/// **WHY THIS MATTERS**: A level-only update must not be read as "unmute".
#[test]
fn given_level_only_body_when_decoded_then_muted_is_absent() {
    let command = Command::decode(SET_VOLUME, &json!({"volume-level": 0.4}));

    assert_eq!(
        command,
        Command::SetVolume(SetVolumeBody {
            level: Some(0.4),
            muted: None,
        })
    );
}

/// **VALUE**: Verifies a body with no usable field is an explicit no-op.
///
/// **BUG THIS CATCHES**: Would catch a wrongly typed `volume-level` ("0.4") being applied as
/// zero volume.
#[test]
fn given_body_without_recognized_fields_when_decoded_then_empty() {
    assert_eq!(
        Command::decode(SET_VOLUME, &json!({"volume-level": "0.4"})),
        Command::Empty {
            name: String::from(SET_VOLUME)
        }
    );
    assert_eq!(
        Command::decode(GOTO_BEAT, &json!(null)),
        Command::Empty {
            name: String::from(GOTO_BEAT)
        }
    );
}

/// **VALUE**: Verifies availability statuses are a closed set.
#[test]
fn given_availability_bodies_when_decoded_then_unknown_status_is_unknown() {
    assert_eq!(
        Command::decode(AVAILABILITY, &json!({"status": "offline"})),
        Command::Availability(AvailabilityStatus::Offline)
    );
    assert_eq!(
        Command::decode(AVAILABILITY, &json!({"status": "napping"})),
        Command::Unknown {
            name: String::from(AVAILABILITY)
        }
    );
}

/// **VALUE**: Verifies unknown command names fall through to `Unknown`.
#[test]
fn given_unknown_command_name_when_decoded_then_unknown_with_name() {
    let command = Command::decode("play-sfx", &json!({"sfx": "chime"}));

    assert_eq!(command.name(), "play-sfx");
    assert!(matches!(command, Command::Unknown { .. }));
}

/// **VALUE**: Verifies raw payload decoding returns the sender's meta with the command.
#[test]
fn given_payload_when_decode_command_then_returns_meta_and_command() {
    let payload = encode_envelope(&make_envelope("docent-1", json!({"volume-muted": true}))).unwrap();

    let (meta, command) = decode_command(SET_VOLUME, &payload).unwrap();

    assert_eq!(meta.source, "docent-1");
    assert_eq!(
        command,
        Command::SetVolume(SetVolumeBody {
            level: None,
            muted: Some(true),
        })
    );
}

/// **VALUE**: Verifies malformed payloads surface as protocol errors.
#[test]
fn given_malformed_payload_when_decode_command_then_returns_error() {
    let result = decode_command(GOTO_BEAT, "{\"meta\":");

    assert!(matches!(result, Err(ProtocolError::Decode { .. })));
}
