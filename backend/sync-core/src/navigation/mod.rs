//! Navigation state machine over moments and beats.

pub mod controller;
pub mod navigator;

pub use controller::NavigationController;
pub use navigator::{Navigator, Transition, resolve_beat_id};
