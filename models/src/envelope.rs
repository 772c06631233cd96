//! Wire envelope: `{ meta: { id, ts, source }, body }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// `<source>-<unix millis>`. Only weakly unique.
    pub id: String,
    /// RFC 3339 / ISO-8601 timestamp of construction.
    pub ts: String,
    /// Device identifier of the publisher.
    pub source: String,
}

/// One message on the bus. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<B = Value> {
    meta: Meta,
    body: B,
}

impl<B> Envelope<B> {
    pub fn from_parts(meta: Meta, body: B) -> Self {
        Self { meta, body }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn into_parts(self) -> (Meta, B) {
        (self.meta, self.body)
    }
}
