//! Message transport: the pub/sub client and the connectors it runs over.

pub mod client;
pub mod connector;
pub mod frames;
pub mod ws;

pub use client::{
    ClientCallbacks, IncomingMessage, MessageClient, MessageHandler, PublishCallbacks,
    PublishOutcome, ReconnectPolicy, SubscriptionId, WeakMessageClient,
};
pub use connector::{Connector, Link};
pub use frames::{BrokerFrame, ClientFrame, Will};
pub use ws::WsConnector;
