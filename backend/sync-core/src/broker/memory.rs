//! In-process broker.
//!
//! Used to run several surfaces inside one process (and as the transport in
//! tests). Supports the same semantics as the hub, plus controls to simulate
//! an unreachable broker and dropped sessions.

use crate::broker::router::Router;
use crate::error::transport::TransportError;
use crate::transport::connector::{Connector, Link};
use crate::transport::frames::{ClientFrame, Will};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use log::{trace, warn};
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct MemoryBroker {
    router: Arc<Router>,
    reachable: Arc<AtomicBool>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            router: Arc::new(Router::default()),
            reachable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// While unreachable, every connect attempt fails.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Drop every session of `client_id` as a network failure would.
    /// Returns the number of sessions dropped.
    pub fn sever(&self, client_id: &str) -> usize {
        self.router.sever(client_id)
    }

    /// Publish a raw payload as if from another client.
    pub fn inject(&self, topic: &str, payload: &str, retain: bool) {
        self.router.publish(topic, payload, retain);
    }

    pub fn retained(&self, topic: &str) -> Option<String> {
        self.router.retained(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.router.subscriber_count(topic)
    }

    pub fn session_count(&self) -> usize {
        self.router.session_count()
    }
}

impl Connector for MemoryBroker {
    fn connect<'a>(
        &'a self,
        client_id: &'a str,
        will: Option<Will>,
    ) -> BoxFuture<'a, Result<Link, TransportError>> {
        Box::pin(async move {
            if !self.reachable.load(Ordering::SeqCst) {
                return Err(TransportError::connect("in-memory broker is unreachable"));
            }

            let (outbound, mut client_rx) = mpsc::unbounded_channel::<ClientFrame>();
            let (session_tx, inbound) = mpsc::unbounded_channel();
            let session = self.router.open(client_id, will, session_tx);
            let router = Arc::clone(&self.router);

            tokio::spawn(async move {
                while let Some(frame) = client_rx.recv().await {
                    trace!("Memory broker session {session} <- {frame:?}");
                    match frame {
                        ClientFrame::Subscribe { topic } => router.subscribe(session, &topic),
                        ClientFrame::Unsubscribe { topic } => router.unsubscribe(session, &topic),
                        ClientFrame::Publish {
                            topic,
                            payload,
                            retain,
                        } => router.publish(&topic, &payload, retain),
                        ClientFrame::Disconnect => {
                            router.close(session, true);
                            return;
                        }
                        ClientFrame::Hello { .. } => {
                            warn!("Session {session} sent a second hello; ignoring");
                        }
                    }
                }
                router.close(session, false);
            });

            Ok(Link { outbound, inbound })
        })
    }

    fn describe(&self) -> String {
        String::from("in-memory broker")
    }
}
