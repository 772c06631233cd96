use crate::beat_id::format_beat_id;
use crate::{ErrorLocation, ModelError, Sequence};

use std::panic::Location;

use serde::Serialize;

/// Where an exhibit currently is within its sequence.
///
/// Only constructible through [`NavigationState::within`] (or
/// [`Sequence::first_state`]), so `beat_idx` is always valid for `moment_id`
/// in the sequence it was checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    moment_id: String,
    beat_idx: usize,
}

impl NavigationState {
    /// Validate a position against a sequence.
    ///
    /// # Errors
    ///
    /// - [`ModelError::UnknownMoment`] if the moment is not in the sequence
    /// - [`ModelError::EmptyMoment`] if the moment has no beats
    /// - [`ModelError::BeatOutOfRange`] if `beat_idx >= beat_count`
    #[track_caller]
    pub fn within(
        sequence: &Sequence,
        moment_id: impl Into<String>,
        beat_idx: usize,
    ) -> Result<Self, ModelError> {
        let moment_id = moment_id.into();
        let moment = sequence
            .find(&moment_id)
            .ok_or_else(|| ModelError::UnknownMoment {
                moment_id: moment_id.clone(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let beat_count = moment.beat_count();
        if beat_count == 0 {
            return Err(ModelError::EmptyMoment {
                moment_id,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if beat_idx >= beat_count {
            return Err(ModelError::BeatOutOfRange {
                moment_id,
                beat_idx,
                beat_count,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            moment_id,
            beat_idx,
        })
    }

    pub fn moment_id(&self) -> &str {
        &self.moment_id
    }

    pub fn beat_idx(&self) -> usize {
        self.beat_idx
    }

    /// The wire beat id for this position.
    pub fn beat_id(&self) -> String {
        format_beat_id(&self.moment_id, self.beat_idx)
    }
}
