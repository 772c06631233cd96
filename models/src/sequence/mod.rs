//! The guided content sequence: ordered moments, each holding ordered beats.
//!
//! Sequences are immutable once built. The navigation layer reads them and
//! never mutates them; use [`SequenceBuilder`](builder::SequenceBuilder) to
//! construct one.

pub mod builder;

use crate::NavigationState;

use serde::Serialize;

/// Smallest navigable unit within a moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Beat {
    pub(crate) handle: String,
    pub(crate) ordinal: usize,
}

impl Beat {
    /// Wire identifier, e.g. `"welcome-3"`.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Zero-based position within the owning moment.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// A named chapter of the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Moment {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) beats: Vec<Beat>,
}

impl Moment {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn beat_count(&self) -> usize {
        self.beats.len()
    }

    pub fn beat(&self, beat_idx: usize) -> Option<&Beat> {
        self.beats.get(beat_idx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub(crate) moments: Vec<Moment>,
}

impl Sequence {
    pub fn moments(&self) -> &[Moment] {
        &self.moments
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    pub fn moment(&self, moment_idx: usize) -> Option<&Moment> {
        self.moments.get(moment_idx)
    }

    pub fn index_of(&self, moment_id: &str) -> Option<usize> {
        self.moments.iter().position(|m| m.id == moment_id)
    }

    pub fn find(&self, moment_id: &str) -> Option<&Moment> {
        self.moments.iter().find(|m| m.id == moment_id)
    }

    /// Total number of beats across all moments.
    pub fn total_beats(&self) -> usize {
        self.moments.iter().map(Moment::beat_count).sum()
    }

    /// First beat of the first moment.
    ///
    /// Returns `None` only for an empty sequence, which the builder refuses
    /// to produce.
    pub fn first_state(&self) -> Option<NavigationState> {
        let first = self.moments.first()?;
        NavigationState::within(self, first.id.clone(), 0).ok()
    }

    /// Last beat of the last moment.
    pub fn last_state(&self) -> Option<NavigationState> {
        let last = self.moments.last()?;
        let beat_idx = last.beat_count().checked_sub(1)?;
        NavigationState::within(self, last.id.clone(), beat_idx).ok()
    }
}
