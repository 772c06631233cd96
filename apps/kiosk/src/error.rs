use common::ErrorLocation;

use sync_core::error::CoreError;
use sync_core::error::config::ConfigError;
use sync_core::error::content::ContentError;
use sync_core::error::navigation::NavigationError;
use sync_core::error::transport::TransportError;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the kiosk process.
///
/// Library errors are flattened to a message; the location is where the
/// kiosk observed them.
#[derive(Debug, Error)]
pub enum KioskError {
    /// Error from this App
    #[error("Kiosk Error: {message} {location}")]
    Kiosk {
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    #[error("Content Error: {message} {location}")]
    Content {
        message: String,
        location: ErrorLocation,
    },

    /// Broker connection or hub startup failed
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    /// Error from sync-core services (sync, navigation)
    #[error("Sync Error: {message} {location}")]
    Sync {
        message: String,
        location: ErrorLocation,
    },

    /// A console line that is not a valid command
    #[error("Console Error: {message} {location}")]
    Console {
        message: String,
        location: ErrorLocation,
    },
}

impl KioskError {
    #[track_caller]
    pub fn console(message: impl Into<String>) -> Self {
        KioskError::Console {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for KioskError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        KioskError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ContentError> for KioskError {
    #[track_caller]
    fn from(error: ContentError) -> Self {
        KioskError::Content {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<TransportError> for KioskError {
    #[track_caller]
    fn from(error: TransportError) -> Self {
        KioskError::Transport {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<NavigationError> for KioskError {
    #[track_caller]
    fn from(error: NavigationError) -> Self {
        KioskError::Sync {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for KioskError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        KioskError::Sync {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for KioskError {
    #[track_caller]
    fn from(error: std::io::Error) -> Self {
        KioskError::Kiosk {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
