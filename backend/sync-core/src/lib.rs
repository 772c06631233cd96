//! Real-time navigation sync for multi-display kiosk exhibits.
//!
//! - [`transport`]: pub/sub client with reconnect, over a [`broker`]
//! - [`protocol`]: envelopes, topics and typed commands
//! - [`navigation`]: moment/beat state machine and the publishing controller
//! - [`sync`]: hooks that apply inbound commands and report effective state

pub mod broker;
pub mod config;
pub mod content;
pub mod error;
pub mod navigation;
pub mod protocol;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod tests;

pub const DEFAULT_HUB_HOSTNAME: &str = "127.0.0.1";
pub const DEFAULT_HUB_PORT: u16 = 1883;
pub const DEFAULT_HUB_BIND: &str = const_format::concatcp!("0.0.0.0:", DEFAULT_HUB_PORT);
pub const DEFAULT_BROKER_URL: &str =
    const_format::concatcp!("ws://", DEFAULT_HUB_HOSTNAME, ":", DEFAULT_HUB_PORT);
