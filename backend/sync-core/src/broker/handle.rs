//! Handle to a running hub.

use crate::broker::router::Router;

use std::net::SocketAddr;
use std::sync::Arc;

use log::info;
use tokio::sync::watch;

/// Handle to a running hub returned by [`start_hub`](crate::broker::start_hub).
///
/// Dropping the handle stops the accept loop and closes every session
/// cleanly (no wills are published).
pub struct HubHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) router: Arc<Router>,
}

impl HubHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `ws://` URL clients on this host can connect to.
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    pub fn session_count(&self) -> usize {
        self.router.session_count()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.router.subscriber_count(topic)
    }

    pub fn retained(&self, topic: &str) -> Option<String> {
        self.router.retained(topic)
    }

    pub fn shutdown(&self) {
        if !*self.shutdown.borrow() {
            info!("Stopping hub on {}", self.local_addr);
        }
        self.shutdown.send_replace(true);
    }
}

impl Drop for HubHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
