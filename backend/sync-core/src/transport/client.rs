//! Publish/subscribe client with connect/reconnect lifecycle.
//!
//! One [`MessageClient`] per mounted surface. The client owns:
//!
//! - a background connection task that connects through a [`Connector`],
//!   retries with exponential backoff and pumps inbound messages
//! - the topic handler registry (exact topic match, handlers run in
//!   registration order)
//! - an optional last will and "birth" message republished on every connect
//!
//! Publishing while disconnected drops the message; nothing is queued.
//!
//! All clones share the same connection. Dropping the last clone without
//! calling [`MessageClient::disconnect`] stops the connection task abruptly,
//! so the broker publishes the will.

use crate::error::transport::TransportError;
use crate::protocol::envelope::make_envelope;
use crate::transport::connector::{Connector, Link};
use crate::transport::frames::{BrokerFrame, ClientFrame, Will};

use models::Envelope;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_millis(500);
const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(30);
const DEFAULT_RECONNECT_MULTIPLIER: f64 = 2.0;

/// Handle identifying one handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A message delivered to a topic handler.
#[derive(Debug, Clone, Copy)]
pub struct IncomingMessage<'a> {
    pub topic: &'a str,
    pub payload: &'a str,
}

pub type MessageHandler = Arc<dyn Fn(&IncomingMessage<'_>) + Send + Sync>;

type ConnectionChangeFn = Arc<dyn Fn(bool) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&TransportError) + Send + Sync>;

/// Lifecycle callbacks supplied at construction.
#[derive(Clone, Default)]
pub struct ClientCallbacks {
    on_connection_change: Option<ConnectionChangeFn>,
    on_error: Option<ErrorFn>,
}

impl ClientCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked exactly once per connected/disconnected transition.
    pub fn on_connection_change(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_connection_change = Some(Arc::new(f));
        self
    }

    /// Invoked for connect failures and connection drops.
    pub fn on_error(mut self, f: impl Fn(&TransportError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    fn connection_changed(&self, connected: bool) {
        if let Some(f) = &self.on_connection_change {
            f(connected);
        }
    }

    fn error(&self, err: &TransportError) {
        if let Some(f) = &self.on_error {
            f(err);
        }
    }
}

/// Optional local completion callbacks for a single publish.
///
/// These report whether the frame was handed to the live session, not
/// whether any peer received it.
#[derive(Default)]
pub struct PublishCallbacks {
    on_success: Option<Box<dyn FnOnce() + Send>>,
    on_error: Option<Box<dyn FnOnce(TransportError) + Send>>,
}

impl PublishCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(TransportError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    fn succeed(self) {
        if let Some(f) = self.on_success {
            f();
        }
    }

    fn fail(self, err: TransportError) {
        if let Some(f) = self.on_error {
            f(err);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the live broker session.
    Sent,
    /// Not connected (or not encodable); the message is gone.
    Dropped,
}

/// Reconnect backoff. There is no overall time limit: the client keeps
/// trying until the broker is reachable again or it is disconnected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_RECONNECT_INITIAL,
            max_interval: DEFAULT_RECONNECT_MAX,
            multiplier: DEFAULT_RECONNECT_MULTIPLIER,
        }
    }
}

impl ReconnectPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.reset();
        backoff
    }
}

struct Birth {
    topic: String,
    body: Value,
    retain: bool,
}

struct ConnectionTask {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

struct ClientInner {
    device_id: String,
    connector: Arc<dyn Connector>,
    callbacks: ClientCallbacks,
    policy: ReconnectPolicy,
    registry: Mutex<HashMap<String, Vec<(SubscriptionId, MessageHandler)>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientFrame>>>,
    connected: watch::Sender<bool>,
    will: Mutex<Option<Will>>,
    birth: Mutex<Option<Birth>>,
    task: Mutex<Option<ConnectionTask>>,
    next_subscription: AtomicU64,
}

/// Owned by clones of [`MessageClient`]; the connection task only holds
/// [`ClientInner`], so dropping the last handle can stop the task.
struct ClientHandle {
    inner: Arc<ClientInner>,
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.inner.task).take() {
            warn!(
                "MessageClient for {} dropped while connected; stopping without clean disconnect",
                self.inner.device_id
            );
            let _ = task.shutdown.send(true);
        }
    }
}

#[derive(Clone)]
pub struct MessageClient {
    handle: Arc<ClientHandle>,
}

/// Non-owning reference to a [`MessageClient`].
///
/// Topic handlers that need to publish hold one of these; a strong clone
/// stored in the client's own registry would keep the client alive forever.
#[derive(Clone)]
pub struct WeakMessageClient {
    handle: Weak<ClientHandle>,
}

impl WeakMessageClient {
    pub fn upgrade(&self) -> Option<MessageClient> {
        self.handle.upgrade().map(|handle| MessageClient { handle })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MessageClient {
    pub fn new(
        device_id: impl Into<String>,
        connector: Arc<dyn Connector>,
        callbacks: ClientCallbacks,
        policy: ReconnectPolicy,
    ) -> Self {
        let (connected, _) = watch::channel(false);
        let inner = ClientInner {
            device_id: device_id.into(),
            connector,
            callbacks,
            policy,
            registry: Mutex::new(HashMap::new()),
            outbound: Mutex::new(None),
            connected,
            will: Mutex::new(None),
            birth: Mutex::new(None),
            task: Mutex::new(None),
            next_subscription: AtomicU64::new(1),
        };

        Self {
            handle: Arc::new(ClientHandle {
                inner: Arc::new(inner),
            }),
        }
    }

    fn inner(&self) -> &Arc<ClientInner> {
        &self.handle.inner
    }

    pub fn downgrade(&self) -> WeakMessageClient {
        WeakMessageClient {
            handle: Arc::downgrade(&self.handle),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.inner().device_id
    }

    pub fn is_connected(&self) -> bool {
        *self.inner().connected.borrow()
    }

    /// Receiver that tracks the connected flag.
    pub fn connection_watch(&self) -> watch::Receiver<bool> {
        self.inner().connected.subscribe()
    }

    /// Wait until the connected flag equals `connected`.
    pub async fn wait_for_connection(&self, connected: bool) {
        let mut rx = self.connection_watch();
        // The sender lives in `inner`, which we hold, so this cannot close.
        let _ = rx.wait_for(|c| *c == connected).await;
    }

    /// Set the will registered with the broker on the next connect.
    pub fn set_will(&self, will: Option<Will>) {
        *lock(&self.inner().will) = will;
    }

    /// Set a body published (in a fresh envelope) right after every connect.
    pub fn set_birth(&self, topic: impl Into<String>, body: Value, retain: bool) {
        *lock(&self.inner().birth) = Some(Birth {
            topic: topic.into(),
            body,
            retain,
        });
    }

    /// Start connecting in the background. Returns immediately.
    ///
    /// Calling this while the connection task is already running is a no-op.
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut task = lock(&self.inner().task);
        if task.is_some() {
            debug!("connect() called while already running; ignoring");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let inner = Arc::clone(self.inner());
        info!(
            "Connecting {} to {}",
            inner.device_id,
            inner.connector.describe()
        );
        let handle = tokio::spawn(run_connection(inner, shutdown_rx));
        *task = Some(ConnectionTask { handle, shutdown });
    }

    /// Cleanly end the session and release every subscription.
    ///
    /// Idempotent; safe on a client that never connected.
    pub async fn disconnect(&self) {
        let inner = self.inner();
        let task = lock(&inner.task).take();

        if let Some(task) = task {
            if let Some(outbound) = lock(&inner.outbound).take() {
                let _ = outbound.send(ClientFrame::Disconnect);
            }
            let _ = task.shutdown.send(true);
            if let Err(e) = task.handle.await {
                warn!("Connection task for {} ended abnormally: {e}", inner.device_id);
            }
            info!("{} disconnected", inner.device_id);
        }

        lock(&inner.registry).clear();
        inner.set_connected(false);
    }

    /// Register `handler` for an exact topic.
    ///
    /// The broker subscription is created with the first handler for a topic;
    /// if not connected it is created on the next connect.
    pub fn subscribe_to_topic(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(&IncomingMessage<'_>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let inner = self.inner();
        let topic = topic.into();
        let id = SubscriptionId(inner.next_subscription.fetch_add(1, Ordering::Relaxed));

        let mut registry = lock(&inner.registry);
        let handlers = registry.entry(topic.clone()).or_default();
        let first = handlers.is_empty();
        handlers.push((id, Arc::new(handler)));

        if first {
            debug!("Subscribing to {topic}");
            inner.send_frame(ClientFrame::Subscribe { topic });
        }

        id
    }

    /// Remove exactly the handler registered under `id`.
    ///
    /// Releases the broker subscription when the last handler goes. Returns
    /// false if no such registration exists.
    pub fn unsubscribe_from_topic(&self, topic: &str, id: SubscriptionId) -> bool {
        let inner = self.inner();
        let mut registry = lock(&inner.registry);

        let Some(handlers) = registry.get_mut(topic) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            registry.remove(topic);
            debug!("Unsubscribing from {topic}");
            inner.send_frame(ClientFrame::Unsubscribe {
                topic: topic.to_string(),
            });
        }

        removed
    }

    /// Number of handlers currently registered for `topic`.
    pub fn handler_count(&self, topic: &str) -> usize {
        lock(&self.inner().registry)
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn publish<B: Serialize>(&self, topic: &str, envelope: &Envelope<B>) -> PublishOutcome {
        self.publish_with(topic, envelope, false, PublishCallbacks::new())
    }

    pub fn publish_retained<B: Serialize>(
        &self,
        topic: &str,
        envelope: &Envelope<B>,
    ) -> PublishOutcome {
        self.publish_with(topic, envelope, true, PublishCallbacks::new())
    }

    /// Wrap `body` in a fresh envelope from this device and publish it.
    pub fn publish_body<B: Serialize>(&self, topic: &str, body: B, retain: bool) -> PublishOutcome {
        let envelope = make_envelope(&self.inner().device_id, body);
        self.publish_with(topic, &envelope, retain, PublishCallbacks::new())
    }

    /// Publish with local completion callbacks.
    pub fn publish_with<B: Serialize>(
        &self,
        topic: &str,
        envelope: &Envelope<B>,
        retain: bool,
        callbacks: PublishCallbacks,
    ) -> PublishOutcome {
        let payload = match serde_json::to_string(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                let err = TransportError::from(e);
                error!("Failed to encode envelope for {topic}: {err}");
                callbacks.fail(err);
                return PublishOutcome::Dropped;
            }
        };

        self.inner().publish_payload(topic, payload, retain, callbacks)
    }
}

impl ClientInner {
    fn send_frame(&self, frame: ClientFrame) -> bool {
        match lock(&self.outbound).as_ref() {
            Some(outbound) => outbound.send(frame).is_ok(),
            None => false,
        }
    }

    fn publish_payload(
        &self,
        topic: &str,
        payload: String,
        retain: bool,
        callbacks: PublishCallbacks,
    ) -> PublishOutcome {
        let sent = self.send_frame(ClientFrame::Publish {
            topic: topic.to_string(),
            payload,
            retain,
        });

        if sent {
            trace!("Published to {topic} (retain={retain})");
            callbacks.succeed();
            PublishOutcome::Sent
        } else {
            debug!("Dropping publish to {topic}: not connected");
            callbacks.fail(TransportError::not_connected(format!(
                "publish to {topic} dropped"
            )));
            PublishOutcome::Dropped
        }
    }

    fn set_connected(&self, connected: bool) {
        let changed = self.connected.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });

        if changed {
            info!(
                "{} is now {}",
                self.device_id,
                if connected { "connected" } else { "disconnected" }
            );
            self.callbacks.connection_changed(connected);
        }
    }

    /// Adopt a fresh session: resubscribe every registered topic, publish the
    /// birth message, then flip the connected flag.
    fn install(&self, outbound: mpsc::UnboundedSender<ClientFrame>) {
        {
            let registry = lock(&self.registry);
            let mut slot = lock(&self.outbound);
            for topic in registry.keys() {
                debug!("Flushing subscription to {topic}");
                let _ = outbound.send(ClientFrame::Subscribe {
                    topic: topic.clone(),
                });
            }
            *slot = Some(outbound);
        }

        let birth = lock(&self.birth)
            .as_ref()
            .map(|b| (b.topic.clone(), b.body.clone(), b.retain));
        if let Some((topic, body, retain)) = birth {
            let envelope = make_envelope(&self.device_id, body);
            match serde_json::to_string(&envelope) {
                Ok(payload) => {
                    self.publish_payload(&topic, payload, retain, PublishCallbacks::new());
                }
                Err(e) => error!("Failed to encode birth message for {topic}: {e}"),
            }
        }

        self.set_connected(true);
    }

    fn uninstall(&self) {
        lock(&self.outbound).take();
        self.set_connected(false);
    }

    /// Deliver to a snapshot of the topic's handlers so handlers may
    /// subscribe or unsubscribe (including themselves) while running.
    fn dispatch(&self, topic: &str, payload: &str) {
        let handlers: Vec<MessageHandler> = lock(&self.registry)
            .get(topic)
            .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            trace!("No handlers for {topic}; dropping message");
            return;
        }

        let message = IncomingMessage { topic, payload };
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&message))).is_err() {
                error!("Handler for {topic} panicked; continuing with remaining handlers");
            }
        }
    }

    fn report_error(&self, err: &TransportError) {
        if err.is_retryable() {
            warn!("{}: {err}", self.device_id);
        } else {
            error!("{}: {err}", self.device_id);
        }
        self.callbacks.error(err);
    }
}

/// Connection task: connect, pump, and reconnect with backoff until shut down.
async fn run_connection(inner: Arc<ClientInner>, mut shutdown: watch::Receiver<bool>) {
    let mut backoff = inner.policy.backoff();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let will = lock(&inner.will).clone();
        let attempt = tokio::select! {
            result = inner.connector.connect(&inner.device_id, will) => result,
            _ = shutdown.changed() => break,
        };

        match attempt {
            Ok(Link {
                outbound,
                mut inbound,
            }) => {
                backoff.reset();
                inner.install(outbound);

                let clean = loop {
                    tokio::select! {
                        frame = inbound.recv() => match frame {
                            Some(BrokerFrame::Message { topic, payload }) => {
                                inner.dispatch(&topic, &payload);
                            }
                            Some(other) => debug!("Ignoring unexpected broker frame: {other:?}"),
                            None => break false,
                        },
                        _ = shutdown.changed() => break true,
                    }
                };

                inner.uninstall();

                if clean {
                    break;
                }

                inner.report_error(&TransportError::connection_lost(format!(
                    "session with {} ended",
                    inner.connector.describe()
                )));
            }
            Err(e) => inner.report_error(&e),
        }

        let delay = backoff
            .next_backoff()
            .unwrap_or(inner.policy.max_interval);
        debug!("{} reconnecting in {delay:?}", inner.device_id);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    debug!("Connection task for {} stopped", inner.device_id);
}
