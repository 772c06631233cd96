use crate::{AvailabilityBody, AvailabilityStatus, GotoBeatBody, SetVolumeBody, VolumeState};

/// **VALUE**: Verifies that a partial volume update only changes the fields present.
///
/// **WHY THIS MATTERS**: The docent slider sends only `volume-level`; the mute toggle sends
/// only `volume-muted`. Treating an absent field as "false"/"0" would unmute or silence
/// a display every time the other control is touched.
///
/// **BUG THIS CATCHES**: Would catch merge logic that defaults missing fields.
#[test]
fn given_level_only_update_when_merged_then_muted_is_carried_over() {
    // GIVEN: A muted display at full volume
    let current = VolumeState {
        level: 1.0,
        muted: true,
    };

    // WHEN: Merging a level-only update
    let merged = current.merge(&SetVolumeBody {
        level: Some(0.4),
        muted: None,
    });

    // THEN: Level changes, muted is preserved
    assert_eq!(merged.level, 0.4);
    assert!(merged.muted);
}

/// **VALUE**: Verifies that volume levels outside 0..1 pass through unclamped.
///
/// **WHY THIS MATTERS**: Clamping belongs to the audio engine. If this layer clamps, the
/// reported state disagrees with what the engine actually applied.
#[test]
fn given_out_of_range_level_when_merged_then_not_clamped() {
    // GIVEN/WHEN: Merging a level above 1
    let merged = VolumeState::default().merge(&SetVolumeBody {
        level: Some(1.7),
        muted: None,
    });

    // THEN: Stored as-is
    assert_eq!(merged.level, 1.7);
}

/// **VALUE**: Verifies the wire field names for command bodies.
///
/// **BUG THIS CATCHES**: Would catch a dropped `#[serde(rename)]`, which would make every
/// display ignore the docent's commands.
#[test]
fn given_bodies_when_serialized_then_use_wire_field_names() {
    // GIVEN: One body of each kind
    let goto = GotoBeatBody {
        beat_id: String::from("problem-1"),
    };
    let report = VolumeState {
        level: 0.4,
        muted: false,
    }
    .to_report();
    let availability = AvailabilityBody {
        status: AvailabilityStatus::Online,
    };

    // WHEN: Serializing
    let goto = serde_json::to_value(&goto).unwrap();
    let report = serde_json::to_value(report).unwrap();
    let availability = serde_json::to_value(availability).unwrap();

    // THEN: Wire names are used
    assert_eq!(goto, serde_json::json!({ "beat-id": "problem-1" }));
    assert_eq!(
        report,
        serde_json::json!({ "volume-level": 0.4, "volume-muted": false })
    );
    assert_eq!(availability, serde_json::json!({ "status": "online" }));
}

/// **VALUE**: Verifies absent volume fields are omitted rather than sent as null.
#[test]
fn given_partial_volume_body_when_serialized_then_absent_fields_omitted() {
    // GIVEN: A mute-only update
    let body = SetVolumeBody {
        level: None,
        muted: Some(true),
    };

    // WHEN: Serializing
    let json = serde_json::to_value(body).unwrap();

    // THEN: Only the present field is on the wire
    assert_eq!(json, serde_json::json!({ "volume-muted": true }));
    assert!(!body.is_empty());
    assert!(SetVolumeBody::default().is_empty());
}

/// **VALUE**: Verifies availability status parsing is closed over the two known values.
#[test]
fn given_status_strings_when_parsed_then_only_known_values_accepted() {
    assert_eq!(
        AvailabilityStatus::parse("online"),
        Some(AvailabilityStatus::Online)
    );
    assert_eq!(
        AvailabilityStatus::parse("offline"),
        Some(AvailabilityStatus::Offline)
    );
    assert_eq!(AvailabilityStatus::parse("ONLINE"), None);
    assert_eq!(AvailabilityStatus::Offline.as_str(), "offline");
}
