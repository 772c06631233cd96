//! WebSocket connector for the broker hub.

use crate::error::transport::TransportError;
use crate::transport::connector::{Connector, Link};
use crate::transport::frames::{BrokerFrame, ClientFrame, Will};

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WsConnector {
    url: Url,
    token: Option<RedactedToken>,
    handshake_timeout: Duration,
}

impl WsConnector {
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] unless `url` is a `ws://` or
    /// `wss://` URL.
    #[track_caller]
    pub fn new(url: &str, token: Option<RedactedToken>) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            message: format!("{url}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(TransportError::InvalidUrl {
                message: format!("{url}: scheme must be ws or wss"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            url,
            token,
            handshake_timeout: HANDSHAKE_TIMEOUT,
        })
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    async fn open(&self, client_id: &str, will: Option<Will>) -> Result<Link, TransportError> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect {
                message: format!("{}: {e}", self.url),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (mut write, mut read) = ws_stream.split();

        let hello = ClientFrame::Hello {
            client_id: client_id.to_string(),
            token: self.token.as_ref().map(|t| t.expose().to_string()),
            will,
        };
        let hello = serde_json::to_string(&hello)?;
        write
            .send(Message::Text(hello.into()))
            .await
            .map_err(|e| TransportError::Handshake {
                message: format!("Failed to send hello: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let reply = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::Handshake {
                        message: String::from("Broker closed the connection during handshake"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                Some(Ok(other)) => trace!("Skipping non-text frame during handshake: {other:?}"),
                Some(Err(e)) => {
                    return Err(TransportError::Handshake {
                        message: format!("Failed to read handshake reply: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        };

        match serde_json::from_str::<BrokerFrame>(reply.as_str()) {
            Ok(BrokerFrame::Welcome) => debug!("Broker {} welcomed {client_id}", self.url),
            Ok(BrokerFrame::Rejected { reason }) => {
                return Err(TransportError::Rejected {
                    reason,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Ok(other) => {
                return Err(TransportError::Handshake {
                    message: format!("Expected welcome, got {other:?}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(e) => {
                return Err(TransportError::Handshake {
                    message: format!("Malformed handshake reply: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<BrokerFrame>();
        let url = self.url.clone();

        // One task owns both halves so that ending it closes the socket.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = outbound_rx.recv() => {
                        let Some(frame) = frame else {
                            debug!("Outbound side dropped; closing socket to {url} without disconnect");
                            break;
                        };
                        let is_disconnect = matches!(frame, ClientFrame::Disconnect);
                        let text = match serde_json::to_string(&frame) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("Failed to encode frame for {url}: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            warn!("Failed to send frame to {url}: {e}");
                            break;
                        }
                        if is_disconnect {
                            let _ = write.close().await;
                            break;
                        }
                    }
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<BrokerFrame>(text.as_str()) {
                                Ok(frame) => {
                                    if inbound_tx.send(frame).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Skipping malformed frame from {url}: {e}"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!("Broker {url} closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Error reading from {url}: {e}");
                            break;
                        }
                    },
                }
            }
        });

        Ok(Link { outbound, inbound })
    }
}

impl Connector for WsConnector {
    fn connect<'a>(
        &'a self,
        client_id: &'a str,
        will: Option<Will>,
    ) -> BoxFuture<'a, Result<Link, TransportError>> {
        Box::pin(async move {
            timeout(self.handshake_timeout, self.open(client_id, will))
                .await
                .map_err(|_| TransportError::Handshake {
                    message: format!(
                        "No welcome from {} within {:?}",
                        self.url, self.handshake_timeout
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })?
        })
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
