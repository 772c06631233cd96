use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Envelope Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Envelope Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Timestamp Error: '{ts}': {message} {location}")]
    InvalidTimestamp {
        ts: String,
        message: String,
        location: ErrorLocation,
    },
}

impl ProtocolError {
    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        ProtocolError::Decode {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
