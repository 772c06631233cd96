//! Conversion between UI addressing `(moment_id, beat_idx)` and the flat wire
//! beat id.
//!
//! Wire ids are `<moment_id>-<ordinal>` where the ordinal is 1-based, so
//! `("welcome", 2)` travels as `"welcome-3"`. Moment ids may themselves contain
//! dashes; only the final `-<digits>` group is the ordinal.

use crate::{ErrorLocation, ModelError};

use std::panic::Location;
use std::sync::OnceLock;

use regex::Regex;

const BEAT_ID_PATTERN: &str = r"^(?P<moment>.+)-(?P<ordinal>\d+)$";
const BEAT_ID_CAPTURE_MOMENT: &str = "moment";
const BEAT_ID_CAPTURE_ORDINAL: &str = "ordinal";

static BEAT_ID_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_beat_id_regex() -> &'static Regex {
    BEAT_ID_REGEX.get_or_init(|| Regex::new(BEAT_ID_PATTERN).expect("valid regex pattern"))
}

/// Format a wire beat id from a moment id and zero-based beat index.
pub fn format_beat_id(moment_id: &str, beat_idx: usize) -> String {
    format!("{moment_id}-{}", beat_idx + 1)
}

/// Parse a wire beat id into `(moment_id, beat_idx)`.
///
/// # Errors
///
/// Returns [`ModelError::BeatId`] when the id has no `-<ordinal>` suffix, the
/// moment part is empty, or the ordinal is zero or does not fit a `usize`.
#[track_caller]
pub fn parse_beat_id(beat_id: &str) -> Result<(String, usize), ModelError> {
    let caps = get_beat_id_regex()
        .captures(beat_id)
        .ok_or_else(|| ModelError::BeatId {
            beat_id: beat_id.to_string(),
            message: String::from("expected '<moment>-<ordinal>'"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let moment = caps
        .name(BEAT_ID_CAPTURE_MOMENT)
        .map(|m| m.as_str())
        .unwrap_or_default();
    let ordinal = caps
        .name(BEAT_ID_CAPTURE_ORDINAL)
        .map(|m| m.as_str())
        .unwrap_or_default();

    let ordinal: usize = ordinal.parse().map_err(|e| ModelError::BeatId {
        beat_id: beat_id.to_string(),
        message: format!("invalid ordinal: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let beat_idx = ordinal.checked_sub(1).ok_or_else(|| ModelError::BeatId {
        beat_id: beat_id.to_string(),
        message: String::from("ordinals start at 1"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok((moment.to_string(), beat_idx))
}
