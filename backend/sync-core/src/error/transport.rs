use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Rejected By Broker: {reason} {location}")]
    Rejected {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Connection Lost: {message} {location}")]
    ConnectionLost {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Broker Url: {message} {location}")]
    InvalidUrl {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl TransportError {
    #[track_caller]
    pub fn not_connected(message: impl Into<String>) -> Self {
        TransportError::NotConnected {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn connection_lost(message: impl Into<String>) -> Self {
        TransportError::ConnectionLost {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn connect(message: impl Into<String>) -> Self {
        TransportError::Connect {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Whether waiting and reconnecting can be expected to help.
    ///
    /// The client retries regardless; this only decides the log level.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connect { .. } => true,
            TransportError::Handshake { .. } => true,
            TransportError::ConnectionLost { .. } => true,
            TransportError::NotConnected { .. } => true,
            TransportError::Io { .. } => true,
            TransportError::Rejected { .. } => false,
            TransportError::Encode { .. } => false,
            TransportError::InvalidUrl { .. } => false,
        }
    }
}

impl From<IoError> for TransportError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        TransportError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        TransportError::Encode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
