use crate::error::protocol::ProtocolError;
use crate::protocol::envelope::{
    EnvelopeOrdering, OrderingKey, encode_envelope, make_envelope, make_envelope_at,
    parse_envelope,
};

use models::{GotoBeatBody, Meta};

use std::time::{Duration, UNIX_EPOCH};

use serde_json::json;

fn meta(id: &str, ts: &str) -> Meta {
    Meta {
        id: id.to_string(),
        ts: ts.to_string(),
        source: String::from("docent"),
    }
}

/// **VALUE**: Verifies the envelope meta layout: `<source>-<millis>` id, RFC 3339 ts, source.
///
/// **WHY THIS MATTERS**: Every peer reads `meta.id` and `meta.ts` for ordering. A drift in
/// either format breaks the conflict rule on the displays.
#[test]
fn given_fixed_clock_when_make_envelope_then_meta_uses_source_and_millis() {
    // GIVEN: 2023-11-14T22:13:20.123Z
    let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);

    // WHEN
    let envelope = make_envelope_at("docent-1", json!({"status": "online"}), now);

    // THEN
    assert_eq!(envelope.meta().id, "docent-1-1700000000123");
    assert_eq!(envelope.meta().ts, "2023-11-14T22:13:20.123000Z");
    assert_eq!(envelope.meta().source, "docent-1");
    assert_eq!(envelope.body(), &json!({"status": "online"}));
}

/// **VALUE**: Verifies an encoded envelope parses back with the same meta and body.
#[test]
fn given_typed_envelope_when_encoded_and_parsed_then_meta_and_body_survive() {
    // GIVEN
    let envelope = make_envelope(
        "docent-1",
        GotoBeatBody {
            beat_id: String::from("problem-1"),
        },
    );

    // WHEN
    let payload = encode_envelope(&envelope).unwrap();
    let parsed = parse_envelope(&payload).unwrap();

    // THEN
    assert_eq!(parsed.meta(), envelope.meta());
    assert_eq!(parsed.body(), &json!({"beat-id": "problem-1"}));
}

/// **VALUE**: Verifies non-JSON payloads produce a decode error instead of panicking.
///
/// **BUG THIS CATCHES**: Would catch a parser that unwraps and takes down the dispatch loop
/// on one bad message.
#[test]
fn given_non_json_payload_when_parsed_then_returns_decode_error() {
    let result = parse_envelope("definitely not json");

    assert!(matches!(result, Err(ProtocolError::Decode { .. })));
}

/// **VALUE**: Verifies JSON without the envelope shape is rejected.
#[test]
fn given_json_without_meta_when_parsed_then_returns_decode_error() {
    let result = parse_envelope(r#"{"beat-id": "welcome-1"}"#);

    assert!(matches!(result, Err(ProtocolError::Decode { .. })));
}

/// **VALUE**: Verifies ordering is by timestamp first and by id on ties.
///
/// **WHY THIS MATTERS**: Two docents can issue commands within the same millisecond. Every
/// display must pick the same winner, so ties need a deterministic breaker.
#[test]
fn given_envelopes_when_compared_then_ts_orders_before_id() {
    // GIVEN
    let earlier = OrderingKey::from_meta(&meta("zeta-1", "2024-05-01T10:00:00.000Z")).unwrap();
    let later = OrderingKey::from_meta(&meta("alpha-1", "2024-05-01T10:00:00.001Z")).unwrap();
    let tie_low = OrderingKey::from_meta(&meta("a-1", "2024-05-01T10:00:00.001Z")).unwrap();
    let tie_high = OrderingKey::from_meta(&meta("b-1", "2024-05-01T10:00:00.001Z")).unwrap();

    // THEN
    assert!(earlier < later);
    assert!(tie_low < tie_high);
    assert_eq!(tie_low.id(), "a-1");
}

/// **VALUE**: Verifies back-to-back envelopes from one device order in creation order.
///
/// **BUG THIS CATCHES**: Would catch a docent's second quick tap sharing the first tap's
/// ordering key and being dropped as stale by every display.
#[test]
fn given_rapid_envelopes_from_one_device_when_ordered_then_strictly_increasing() {
    // GIVEN/WHEN
    let keys: Vec<OrderingKey> = (0..200)
        .map(|_| make_envelope("docent-1", json!({})).ordering_key().unwrap())
        .collect();

    // THEN
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
}

/// **VALUE**: Verifies envelopes expose their ordering key directly.
#[test]
fn given_envelope_when_ordering_key_then_matches_meta() {
    let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
    let envelope = make_envelope_at("docent-1", json!({}), now);

    let key = envelope.ordering_key().unwrap();

    assert_eq!(key.ts(), now);
    assert_eq!(key.id(), "docent-1-1700000000123");
}

/// **VALUE**: Verifies garbage timestamps are reported, not silently ordered.
#[test]
fn given_invalid_timestamp_when_ordering_key_then_returns_invalid_timestamp() {
    let result = OrderingKey::from_meta(&meta("docent-1", "yesterday"));

    match result {
        Err(ProtocolError::InvalidTimestamp { ts, .. }) => assert_eq!(ts, "yesterday"),
        other => panic!("expected InvalidTimestamp, got {other:?}"),
    }
}
