//! State synchronization hooks.
//!
//! Bidirectional glue between local exhibit state and the bus: inbound
//! commands are applied through a [`StateAccess`] and the effective state is
//! reported back.

pub mod audio;
pub mod availability;
pub mod beat;
pub mod service;
pub mod state_access;
pub mod volume;

pub use audio::{AudioEngine, LoggingAudioEngine};
pub use availability::AvailabilityMonitor;
pub use beat::{BeatHook, BeatOutcome};
pub use service::SyncService;
pub use state_access::{SharedState, StateAccess};
pub use volume::VolumeHook;
