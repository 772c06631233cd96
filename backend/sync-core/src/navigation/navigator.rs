//! Pure navigation over a [`Sequence`].
//!
//! The navigator owns the current [`NavigationState`] and computes
//! transitions. It never wraps: `next` at the last beat of the last moment
//! and `previous` at the first beat of the first moment are disabled and
//! leave the state untouched.

use crate::error::navigation::NavigationError;

use common::ErrorLocation;
use models::{Moment, NavigationState, Sequence, parse_beat_id};

use std::panic::Location;
use std::sync::Arc;

use log::error;

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Moved {
        from: NavigationState,
        to: NavigationState,
    },
    /// At the end of the sequence in the requested direction; nothing changed.
    Disabled,
}

impl Transition {
    pub fn is_moved(&self) -> bool {
        matches!(self, Transition::Moved { .. })
    }

    /// The new state, if the transition moved.
    pub fn target(&self) -> Option<&NavigationState> {
        match self {
            Transition::Moved { to, .. } => Some(to),
            Transition::Disabled => None,
        }
    }
}

/// Resolve a wire beat id against `sequence`.
///
/// The `<moment>-<ordinal>` form published by [`NavigationState::beat_id`]
/// is tried first; CMS beat handles are accepted as aliases after that.
///
/// # Errors
///
/// Returns [`NavigationError::InvalidTarget`] if the id is malformed or
/// names a moment or beat the sequence does not have.
#[track_caller]
pub fn resolve_beat_id(
    sequence: &Sequence,
    beat_id: &str,
) -> Result<NavigationState, NavigationError> {
    let formatted_error = match parse_beat_id(beat_id)
        .and_then(|(moment_id, beat_idx)| NavigationState::within(sequence, moment_id, beat_idx))
    {
        Ok(state) => return Ok(state),
        Err(e) => e,
    };

    let by_handle = sequence.moments().iter().find_map(|moment| {
        moment
            .beats()
            .iter()
            .position(|beat| beat.handle() == beat_id)
            .map(|beat_idx| (moment.id(), beat_idx))
    });

    match by_handle {
        Some((moment_id, beat_idx)) => Ok(NavigationState::within(sequence, moment_id, beat_idx)?),
        None => Err(NavigationError::from(formatted_error)),
    }
}

#[derive(Debug, Clone)]
pub struct Navigator {
    sequence: Arc<Sequence>,
    state: NavigationState,
    moment_idx: usize,
}

impl Navigator {
    /// Start at the first beat of the first moment.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::EmptySequence`] if the sequence has no
    /// beats.
    #[track_caller]
    pub fn new(sequence: Arc<Sequence>) -> Result<Self, NavigationError> {
        let state = sequence
            .first_state()
            .ok_or_else(|| NavigationError::EmptySequence {
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self {
            sequence,
            state,
            moment_idx: 0,
        })
    }

    /// Start at a snapshot, e.g. the most recent reported state.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTarget`] if the snapshot does not
    /// fit the sequence.
    #[track_caller]
    pub fn with_state(
        sequence: Arc<Sequence>,
        state: &NavigationState,
    ) -> Result<Self, NavigationError> {
        let mut navigator = Self::new(sequence)?;
        navigator.goto(state.moment_id(), state.beat_idx())?;
        Ok(navigator)
    }

    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.sequence
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn current_beat_id(&self) -> String {
        self.state.beat_id()
    }

    /// `(moment_idx, beat_idx)`.
    pub fn position(&self) -> (usize, usize) {
        (self.moment_idx, self.state.beat_idx())
    }

    /// `(flat beat index, total beats)`.
    pub fn progress(&self) -> (usize, usize) {
        let before: usize = self.sequence.moments()[..self.moment_idx]
            .iter()
            .map(Moment::beat_count)
            .sum();
        (before + self.state.beat_idx(), self.sequence.total_beats())
    }

    fn current_moment(&self) -> Option<&Moment> {
        self.sequence.moment(self.moment_idx)
    }

    pub fn is_next_disabled(&self) -> bool {
        let last_beat = self
            .current_moment()
            .map(|m| self.state.beat_idx() + 1 >= m.beat_count())
            .unwrap_or(true);
        last_beat && self.moment_idx + 1 >= self.sequence.len()
    }

    pub fn is_previous_disabled(&self) -> bool {
        self.state.beat_idx() == 0 && self.moment_idx == 0
    }

    pub fn next(&mut self) -> Transition {
        if self.is_next_disabled() {
            return Transition::Disabled;
        }

        let beat_count = self.current_moment().map(Moment::beat_count).unwrap_or(0);
        if self.state.beat_idx() + 1 < beat_count {
            self.step_to(self.moment_idx, self.state.beat_idx() + 1)
        } else {
            self.step_to(self.moment_idx + 1, 0)
        }
    }

    pub fn previous(&mut self) -> Transition {
        if self.is_previous_disabled() {
            return Transition::Disabled;
        }

        if self.state.beat_idx() > 0 {
            return self.step_to(self.moment_idx, self.state.beat_idx() - 1);
        }

        let moment_idx = self.moment_idx - 1;
        let last_beat = self
            .sequence
            .moment(moment_idx)
            .map(|m| m.beat_count().saturating_sub(1))
            .unwrap_or(0);
        self.step_to(moment_idx, last_beat)
    }

    /// Jump to an arbitrary beat. Jumping to the current beat still counts
    /// as a move.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::InvalidTarget`] for an unknown moment or an
    /// out-of-range beat; the state is unchanged.
    #[track_caller]
    pub fn goto(&mut self, moment_id: &str, beat_idx: usize) -> Result<Transition, NavigationError> {
        let target = NavigationState::within(&self.sequence, moment_id, beat_idx)?;
        Ok(self.move_to(target))
    }

    /// [`Navigator::goto`] addressed by wire beat id.
    ///
    /// # Errors
    ///
    /// See [`resolve_beat_id`].
    #[track_caller]
    pub fn goto_beat_id(&mut self, beat_id: &str) -> Result<Transition, NavigationError> {
        let target = resolve_beat_id(&self.sequence, beat_id)?;
        Ok(self.move_to(target))
    }

    fn step_to(&mut self, moment_idx: usize, beat_idx: usize) -> Transition {
        let Some(moment) = self.sequence.moment(moment_idx) else {
            return Transition::Disabled;
        };

        match NavigationState::within(&self.sequence, moment.id(), beat_idx) {
            Ok(target) => self.move_to(target),
            Err(e) => {
                error!("Computed an invalid navigation target: {e}");
                Transition::Disabled
            }
        }
    }

    fn move_to(&mut self, target: NavigationState) -> Transition {
        self.moment_idx = self.sequence.index_of(target.moment_id()).unwrap_or(0);
        let from = std::mem::replace(&mut self.state, target.clone());
        Transition::Moved { from, to: target }
    }
}
