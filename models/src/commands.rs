//! Known command and state-report bodies.
//!
//! Field names follow the wire format (`beat-id`, `volume-level`,
//! `volume-muted`). Unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotoBeatBody {
    #[serde(rename = "beat-id")]
    pub beat_id: String,
}

/// Partial volume update. Absent fields leave the current value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SetVolumeBody {
    #[serde(
        rename = "volume-level",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<f64>,

    #[serde(
        rename = "volume-muted",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub muted: Option<bool>,
}

impl SetVolumeBody {
    /// True when neither field is present; applying it is a no-op.
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.muted.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    Online,
    Offline,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Online => "online",
            AvailabilityStatus::Offline => "offline",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "online" => Some(AvailabilityStatus::Online),
            "offline" => Some(AvailabilityStatus::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityBody {
    pub status: AvailabilityStatus,
}

/// Effective audio state of an exhibit.
///
/// `level` is nominally 0..1 but is not clamped here; the audio engine owns
/// clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeState {
    pub level: f64,
    pub muted: bool,
}

impl Default for VolumeState {
    fn default() -> Self {
        Self {
            level: 1.0,
            muted: false,
        }
    }
}

impl VolumeState {
    /// Apply only the fields present in `update`.
    pub fn merge(&self, update: &SetVolumeBody) -> VolumeState {
        VolumeState {
            level: update.level.unwrap_or(self.level),
            muted: update.muted.unwrap_or(self.muted),
        }
    }

    /// Full report body carrying both fields.
    pub fn to_report(&self) -> SetVolumeBody {
        SetVolumeBody {
            level: Some(self.level),
            muted: Some(self.muted),
        }
    }
}
