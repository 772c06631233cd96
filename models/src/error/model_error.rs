use crate::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Beat Id Error: '{beat_id}': {message} {location}")]
    BeatId {
        beat_id: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Moment Error: '{moment_id}' {location}")]
    UnknownMoment {
        moment_id: String,
        location: ErrorLocation,
    },

    #[error("Empty Moment Error: '{moment_id}' has no beats {location}")]
    EmptyMoment {
        moment_id: String,
        location: ErrorLocation,
    },

    #[error("Beat Out Of Range Error: '{moment_id}' beat {beat_idx} (beat count {beat_count}) {location}")]
    BeatOutOfRange {
        moment_id: String,
        beat_idx: usize,
        beat_count: usize,
        location: ErrorLocation,
    },
}
