//! Domain models for the kiosk synchronization layer.
//!
//! Pure data structures: the guided content sequence (moments and beats),
//! the navigation position within it, and the wire envelope and command
//! bodies exchanged over the broker. No I/O and no clocks live here.

pub mod beat_id;
pub mod commands;
pub mod envelope;
pub mod error;
pub mod navigation_state;
pub mod sequence;

pub use beat_id::{format_beat_id, parse_beat_id};
pub use commands::{
    AvailabilityBody, AvailabilityStatus, GotoBeatBody, SetVolumeBody, VolumeState,
};
pub use common::ErrorLocation;
pub use envelope::{Envelope, Meta};
pub use error::model_error::ModelError;
pub use navigation_state::NavigationState;
pub use sequence::builder::SequenceBuilder;
pub use sequence::{Beat, Moment, Sequence};

#[cfg(test)]
mod tests;
