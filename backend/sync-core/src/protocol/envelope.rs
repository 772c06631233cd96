//! Envelope construction, parsing and ordering.

use crate::error::protocol::ProtocolError;

use common::ErrorLocation;
use models::{Envelope, Meta};

use std::cmp::Ordering;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

static LAST_STAMP_MICROS: AtomicU64 = AtomicU64::new(0);

/// Wall-clock time nudged forward so stamps taken in this process strictly
/// increase, even for envelopes built within the same microsecond.
fn next_stamp() -> SystemTime {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or_default();

    let (Ok(previous) | Err(previous)) =
        LAST_STAMP_MICROS.fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        });

    UNIX_EPOCH + Duration::from_micros(now.max(previous.saturating_add(1)))
}

/// Wrap `body` in a fresh envelope stamped now.
///
/// The id is `<source>-<unix millis>` and is only weakly unique: two
/// envelopes built by the same device within one millisecond share an id.
/// Their microsecond timestamps still differ, so they order correctly.
pub fn make_envelope<B>(source: &str, body: B) -> Envelope<B> {
    make_envelope_at(source, body, next_stamp())
}

/// [`make_envelope`] with an explicit clock reading.
pub fn make_envelope_at<B>(source: &str, body: B, now: SystemTime) -> Envelope<B> {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    Envelope::from_parts(
        Meta {
            id: format!("{source}-{millis}"),
            ts: humantime::format_rfc3339_micros(now).to_string(),
            source: source.to_string(),
        },
        body,
    )
}

/// Parse a payload into an envelope with an untyped body.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] for non-JSON payloads and JSON that
/// lacks `meta` or `body`.
#[track_caller]
pub fn parse_envelope(payload: &str) -> Result<Envelope<Value>, ProtocolError> {
    serde_json::from_str(payload).map_err(|e| ProtocolError::Decode {
        message: format!("{e} (payload: {})", preview(payload)),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the body cannot be serialized.
#[track_caller]
pub fn encode_envelope<B: Serialize>(envelope: &Envelope<B>) -> Result<String, ProtocolError> {
    serde_json::to_string(envelope).map_err(|e| ProtocolError::Encode {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

fn preview(payload: &str) -> String {
    const MAX: usize = 64;
    match payload.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &payload[..cut]),
        None => payload.to_string(),
    }
}

/// Total order over envelopes: timestamp first, then id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingKey {
    ts: SystemTime,
    id: String,
}

impl OrderingKey {
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTimestamp`] if `meta.ts` is not an
    /// RFC 3339 timestamp.
    #[track_caller]
    pub fn from_meta(meta: &Meta) -> Result<Self, ProtocolError> {
        let ts = humantime::parse_rfc3339_weak(&meta.ts).map_err(|e| {
            ProtocolError::InvalidTimestamp {
                ts: meta.ts.clone(),
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        Ok(Self {
            ts,
            id: meta.id.clone(),
        })
    }

    pub fn ts(&self) -> SystemTime {
        self.ts
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ts.cmp(&other.ts).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordering access on envelopes.
pub trait EnvelopeOrdering {
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTimestamp`] for an unparseable `ts`.
    fn ordering_key(&self) -> Result<OrderingKey, ProtocolError>;
}

impl<B> EnvelopeOrdering for Envelope<B> {
    #[track_caller]
    fn ordering_key(&self) -> Result<OrderingKey, ProtocolError> {
        OrderingKey::from_meta(self.meta())
    }
}
