use common::ErrorLocation;
use models::ModelError;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum NavigationError {
    #[error("Empty Sequence Error: sequence has no beats {location}")]
    EmptySequence { location: ErrorLocation },

    #[error("Invalid Target Error: {message} {location}")]
    InvalidTarget {
        message: String,
        location: ErrorLocation,
        #[source]
        source: ModelError,
    },
}

impl From<ModelError> for NavigationError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        NavigationError::InvalidTarget {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: error,
        }
    }
}
