//! Broker hub served over WebSocket.
//!
//! Every display and docent connects here. The hub:
//!
//! - accepts WebSocket connections on the configured bind address
//! - requires a `hello` frame first (optionally carrying a shared token)
//! - routes publishes to exact-topic subscribers, keeps retained payloads
//! - publishes a session's will when it drops without a `disconnect` frame
//!
//! # Protocol
//!
//! JSON text frames; see [`ClientFrame`] and [`BrokerFrame`].

use crate::broker::handle::HubHandle;
use crate::broker::router::Router;
use crate::broker::session::SessionState;
use crate::error::transport::TransportError;
use crate::transport::frames::{BrokerFrame, ClientFrame, Will};

use common::{ErrorLocation, RedactedToken};

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

type WsWrite = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsRead = SplitStream<WebSocketStream<TcpStream>>;

const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Starts the hub on `bind` (e.g. `0.0.0.0:1883`, or `127.0.0.1:0` for an
/// ephemeral port).
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the address cannot be bound.
pub async fn start_hub(
    bind: &str,
    auth_token: Option<RedactedToken>,
) -> Result<HubHandle, TransportError> {
    start_hub_with_hello_timeout(bind, auth_token, HELLO_TIMEOUT).await
}

/// [`start_hub`] with a custom limit on how long a new connection may take
/// to send its `hello`. Connections that miss it are rejected and closed.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the address cannot be bound.
pub async fn start_hub_with_hello_timeout(
    bind: &str,
    auth_token: Option<RedactedToken>,
    hello_timeout: Duration,
) -> Result<HubHandle, TransportError> {
    let listener = TcpListener::bind(bind).await?;
    let local_addr = listener.local_addr()?;
    let router = Arc::new(Router::default());
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    info!(
        "Hub listening on {local_addr} ({})",
        if auth_token.is_some() { "token required" } else { "open" }
    );

    let accept_router = Arc::clone(&router);
    TokioSpawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Client connecting from {addr}");
                        TokioSpawn(handle_connection(
                            stream,
                            addr,
                            auth_token.clone(),
                            hello_timeout,
                            Arc::clone(&accept_router),
                            shutdown_rx.clone(),
                        ));
                    }
                    Err(e) => warn!("Failed to accept connection: {e}"),
                },
                _ = shutdown_rx.changed() => break,
            }
        }
        info!("Hub on {local_addr} stopped accepting connections");
    });

    Ok(HubHandle {
        local_addr,
        shutdown,
        router,
    })
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: Option<RedactedToken>,
    hello_timeout: Duration,
    router: Arc<Router>,
    shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = serve_connection(stream, addr, auth_token, hello_timeout, router, shutdown).await
    {
        warn!("Connection from {addr} ended with error: {e}");
    }
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: Option<RedactedToken>,
    hello_timeout: Duration,
    router: Arc<Router>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake {
            message: format!("WebSocket handshake with {addr} failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let (mut write, mut read) = ws_stream.split();
    let mut state = SessionState::new(auth_token);

    // First frame MUST be hello
    let hello = match timeout(
        hello_timeout,
        read_hello(&mut read, &mut write, &mut state, addr),
    )
    .await
    {
        Ok(hello) => hello?,
        Err(_) => {
            warn!("Client {addr} sent no hello within {hello_timeout:?}; closing");
            send_frame(
                &mut write,
                &BrokerFrame::Rejected {
                    reason: String::from("hello timed out"),
                },
            )
            .await?;
            let _ = write.close().await;
            return Ok(());
        }
    };
    let Some((client_id, will)) = hello else {
        return Ok(());
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<BrokerFrame>();
    let session = router.open(&client_id, will, tx);

    let clean = loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientFrame>(text.as_str()) {
                        Ok(ClientFrame::Subscribe { topic }) => router.subscribe(session, &topic),
                        Ok(ClientFrame::Unsubscribe { topic }) => router.unsubscribe(session, &topic),
                        Ok(ClientFrame::Publish { topic, payload, retain }) => {
                            router.publish(&topic, &payload, retain);
                        }
                        Ok(ClientFrame::Disconnect) => break true,
                        Ok(ClientFrame::Hello { .. }) => {
                            warn!("{client_id} sent a second hello; ignoring");
                        }
                        Err(e) => warn!("Skipping malformed frame from {client_id}: {e}"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break false,
                Some(Ok(Message::Binary(_))) => {
                    warn!("{client_id} sent a binary frame; ignoring");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Read error from {client_id}: {e}");
                    break false;
                }
            },
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    break false;
                };
                if let Err(e) = send_frame(&mut write, &frame).await {
                    debug!("Send to {client_id} failed: {e}");
                    break false;
                }
            }
            // Hub shutdown is not a client failure; no will.
            _ = shutdown.changed() => break true,
        }
    };

    router.close(session, clean);
    let _ = write.close().await;
    Ok(())
}

/// Reads the hello frame and answers it. Returns `None` if the connection
/// should be closed.
async fn read_hello(
    read: &mut WsRead,
    write: &mut WsWrite,
    state: &mut SessionState,
    addr: SocketAddr,
) -> Result<Option<(String, Option<Will>)>, TransportError> {
    let text = match read.next().await {
        Some(Ok(Message::Text(text))) => text,
        Some(Ok(_)) => {
            warn!("Client {addr} sent a non-text first frame");
            return Ok(None);
        }
        Some(Err(e)) => {
            error!("Error reading first frame from {addr}: {e}");
            return Err(TransportError::Handshake {
                message: format!("Error reading first frame: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            warn!("Client {addr} disconnected before hello");
            return Ok(None);
        }
    };

    let (client_id, token, will) = match serde_json::from_str::<ClientFrame>(text.as_str()) {
        Ok(ClientFrame::Hello {
            client_id,
            token,
            will,
        }) => (client_id, token, will),
        Ok(_) | Err(_) => {
            warn!("Client {addr} handshake failed: first frame was not hello");
            send_frame(
                write,
                &BrokerFrame::Rejected {
                    reason: String::from("first frame must be hello"),
                },
            )
            .await?;
            return Ok(None);
        }
    };

    match state.accept_hello(&client_id, token.as_deref()) {
        Ok(()) => {
            info!(
                "Client {addr} authenticated as {}",
                state.client_id().unwrap_or(&client_id)
            );
            send_frame(write, &BrokerFrame::Welcome).await?;
            Ok(Some((client_id, will)))
        }
        Err(reason) => {
            warn!("Client {addr} rejected: {reason}");
            send_frame(
                write,
                &BrokerFrame::Rejected {
                    reason: reason.to_string(),
                },
            )
            .await?;
            let _ = write.close().await;
            Ok(None)
        }
    }
}

async fn send_frame(write: &mut WsWrite, frame: &BrokerFrame) -> Result<(), TransportError> {
    let text = serde_json::to_string(frame)?;
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| TransportError::ConnectionLost {
            message: format!("Failed to send frame: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
