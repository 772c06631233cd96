use common::ErrorLocation;
use models::ModelError;

use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ContentError {
    #[error("Content Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content Fetch Error: {message} {location}")]
    Fetch {
        message: String,
        is_timeout: bool,
        location: ErrorLocation,
    },

    #[error("Content Parse Error: {message} {location}")]
    Parse {
        message: String,
        location: ErrorLocation,
    },

    #[error("Content Invalid Error: {message} {location}")]
    Invalid {
        message: String,
        location: ErrorLocation,
        #[source]
        source: ModelError,
    },

    #[error("No Content Source Error: neither a content path nor a url is configured {location}")]
    NoSource { location: ErrorLocation },
}

impl From<reqwest::Error> for ContentError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        ContentError::Fetch {
            is_timeout: error.is_timeout(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ModelError> for ContentError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        ContentError::Invalid {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: error,
        }
    }
}
