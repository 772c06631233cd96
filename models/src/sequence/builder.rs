use crate::beat_id::format_beat_id;
use crate::error::model_error::ModelError;
use crate::{Beat, ErrorLocation, Moment, Sequence};

use std::collections::{HashMap, HashSet};
use std::panic::Location;

#[derive(Debug)]
struct PendingMoment {
    id: String,
    title: String,
    handles: Vec<Option<String>>,
}

/// Builder for validated [`Sequence`] instances.
///
/// Beats without an explicit handle get the formatted wire id
/// (`<moment>-<ordinal>`). An explicit handle may not equal the wire id of a
/// different beat.
#[derive(Debug, Default)]
pub struct SequenceBuilder {
    moments: Vec<PendingMoment>,
}

impl SequenceBuilder {
    /// Add a moment with `beat_count` beats using default handles.
    pub fn with_moment(
        self,
        id: impl Into<String>,
        title: impl Into<String>,
        beat_count: usize,
    ) -> Self {
        self.with_moment_handles(id, title, vec![None; beat_count])
    }

    /// Add a moment whose beats may carry CMS-provided handles.
    pub fn with_moment_handles(
        mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        handles: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        self.moments.push(PendingMoment {
            id: id.into(),
            title: title.into(),
            handles: handles.into_iter().collect(),
        });
        self
    }

    /// Build the sequence with validation.
    #[track_caller]
    pub fn build(self) -> Result<Sequence, ModelError> {
        if self.moments.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Sequence must contain at least one moment"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let wire_ids: HashMap<String, (String, usize)> = self
            .moments
            .iter()
            .flat_map(|pending| {
                (0..pending.handles.len()).map(move |ordinal| {
                    (
                        format_beat_id(&pending.id, ordinal),
                        (pending.id.clone(), ordinal),
                    )
                })
            })
            .collect();

        let mut seen_ids = HashSet::new();
        let mut seen_handles = HashSet::new();
        let mut moments = Vec::with_capacity(self.moments.len());

        for pending in self.moments {
            if pending.id.trim().is_empty() {
                return Err(ModelError::Validation {
                    message: String::from("Moment id cannot be empty"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if pending.id.chars().any(char::is_control) {
                return Err(ModelError::Validation {
                    message: format!("Moment id contains control characters: {:?}", pending.id),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if !seen_ids.insert(pending.id.clone()) {
                return Err(ModelError::Validation {
                    message: format!("Duplicate moment id: {}", pending.id),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if pending.handles.is_empty() {
                return Err(ModelError::EmptyMoment {
                    moment_id: pending.id,
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            let mut beats = Vec::with_capacity(pending.handles.len());
            for (ordinal, handle) in pending.handles.into_iter().enumerate() {
                let handle = match handle {
                    Some(h) if h.trim().is_empty() => {
                        return Err(ModelError::Validation {
                            message: format!(
                                "Beat {ordinal} of '{}' has an empty handle",
                                pending.id
                            ),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                    Some(h) => {
                        if let Some((moment_id, other)) = wire_ids.get(&h)
                            && (moment_id != &pending.id || *other != ordinal)
                        {
                            return Err(ModelError::Validation {
                                message: format!(
                                    "Beat handle '{h}' is the wire id of beat {other} of '{moment_id}'"
                                ),
                                location: ErrorLocation::from(Location::caller()),
                            });
                        }
                        h
                    }
                    None => format_beat_id(&pending.id, ordinal),
                };

                if !seen_handles.insert(handle.clone()) {
                    return Err(ModelError::Validation {
                        message: format!("Duplicate beat handle: {handle}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                beats.push(Beat { handle, ordinal });
            }

            let title = if pending.title.trim().is_empty() {
                pending.id.clone()
            } else {
                pending.title
            };

            moments.push(Moment {
                id: pending.id,
                title,
                beats,
            });
        }

        Ok(Sequence { moments })
    }
}
