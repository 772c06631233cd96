//! Command envelope protocol.

pub mod command;
pub mod envelope;
pub mod topics;

pub use command::{Command, decode_command};
pub use envelope::{
    EnvelopeOrdering, OrderingKey, encode_envelope, make_envelope, make_envelope_at,
    parse_envelope,
};
pub use topics::{AVAILABILITY, GOTO_BEAT, SET_VOLUME, TopicKind, TopicParts, Topics};
