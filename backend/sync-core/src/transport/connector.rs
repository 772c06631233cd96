//! Seam between the client's connection lifecycle and a concrete broker.

use crate::error::transport::TransportError;
use crate::transport::frames::{BrokerFrame, ClientFrame, Will};

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

/// An established broker session.
///
/// Frames sent on `outbound` go to the broker. `inbound` yields broker frames
/// until the session ends, at which point it returns `None`. Dropping
/// `outbound` without first sending [`ClientFrame::Disconnect`] is treated by
/// the broker as an abrupt drop.
pub struct Link {
    pub outbound: mpsc::UnboundedSender<ClientFrame>,
    pub inbound: mpsc::UnboundedReceiver<BrokerFrame>,
}

/// Something that can open a broker session.
///
/// Implementations perform the `hello` handshake themselves and only return a
/// [`Link`] once the broker has welcomed the client.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(
        &'a self,
        client_id: &'a str,
        will: Option<Will>,
    ) -> BoxFuture<'a, Result<Link, TransportError>>;

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}
