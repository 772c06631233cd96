//! Per-surface synchronization service.
//!
//! One [`SyncService`] per mounted exhibit surface. It is constructed
//! explicitly and handed to whatever needs it; nothing here is global.
//!
//! On [`start`](SyncService::start) it subscribes the configured hooks to the
//! exhibit's command topics and connects. Availability is `online` after every
//! connect and `offline` through the will or [`shutdown`](SyncService::shutdown).
//! After every connect the hooks re-report their state so observers that
//! joined late see it.

use crate::error::CoreError;
use crate::protocol::topics::Topics;
use crate::sync::audio::AudioEngine;
use crate::sync::availability;
use crate::sync::beat::BeatHook;
use crate::sync::state_access::StateAccess;
use crate::sync::volume::VolumeHook;
use crate::transport::client::{MessageClient, SubscriptionId, WeakMessageClient};

use models::{AvailabilityStatus, NavigationState, Sequence, VolumeState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SyncService {
    client: MessageClient,
    topics: Topics,
    exhibit_id: String,
    volume: Option<Arc<VolumeHook>>,
    beat: Option<Arc<BeatHook>>,
    subscriptions: Mutex<Vec<(String, SubscriptionId)>>,
    reporter: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl SyncService {
    /// # Errors
    ///
    /// Returns [`CoreError::Protocol`] if the availability will cannot be
    /// encoded.
    pub fn new(
        client: MessageClient,
        topics: Topics,
        exhibit_id: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let exhibit_id = exhibit_id.into();
        availability::register(&client, &topics, &exhibit_id)?;

        Ok(Self {
            client,
            topics,
            exhibit_id,
            volume: None,
            beat: None,
            subscriptions: Mutex::new(Vec::new()),
            reporter: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn with_volume(
        mut self,
        state: Arc<dyn StateAccess<VolumeState>>,
        audio: Arc<dyn AudioEngine>,
    ) -> Self {
        self.volume = Some(Arc::new(VolumeHook::new(
            self.exhibit_id.clone(),
            self.topics.clone(),
            state,
            audio,
        )));
        self
    }

    pub fn with_beat(
        mut self,
        sequence: Arc<Sequence>,
        state: Arc<dyn StateAccess<NavigationState>>,
    ) -> Self {
        self.beat = Some(Arc::new(BeatHook::new(
            self.exhibit_id.clone(),
            self.topics.clone(),
            sequence,
            state,
        )));
        self
    }

    pub fn client(&self) -> &MessageClient {
        &self.client
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn exhibit_id(&self) -> &str {
        &self.exhibit_id
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn volume_hook(&self) -> Option<&Arc<VolumeHook>> {
        self.volume.as_ref()
    }

    pub fn beat_hook(&self) -> Option<&Arc<BeatHook>> {
        self.beat.as_ref()
    }

    /// Subscribe the hooks and start connecting. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.stopped.store(false, Ordering::SeqCst);
        self.attach();

        let mut reporter = lock(&self.reporter);
        if reporter.is_none() {
            *reporter = Some(tokio::spawn(report_on_connect(
                self.client.connection_watch(),
                self.client.downgrade(),
                self.volume.clone(),
                self.beat.clone(),
            )));
        }
        drop(reporter);

        info!("Starting sync for exhibit {}", self.exhibit_id);
        self.client.connect();
    }

    /// Announce `offline`, release every subscription and disconnect.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        availability::announce(
            &self.client,
            &self.topics,
            &self.exhibit_id,
            AvailabilityStatus::Offline,
        );
        self.detach();

        if let Some(reporter) = lock(&self.reporter).take() {
            reporter.abort();
        }

        self.client.disconnect().await;
        info!("Sync for exhibit {} shut down", self.exhibit_id);
    }

    /// Switch to a new client (e.g. a new device identity): the old
    /// connection is shut down and the hooks move to the new one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Protocol`] if the new will cannot be encoded; the
    /// old client stays shut down.
    pub async fn rebind(&mut self, client: MessageClient) -> Result<(), CoreError> {
        self.shutdown().await;
        availability::register(&client, &self.topics, &self.exhibit_id)?;
        info!(
            "Rebinding exhibit {} from {} to {}",
            self.exhibit_id,
            self.client.device_id(),
            client.device_id()
        );
        self.client = client;
        self.start();
        Ok(())
    }

    fn attach(&self) {
        let mut subscriptions = lock(&self.subscriptions);
        if !subscriptions.is_empty() {
            return;
        }

        if let Some(hook) = &self.volume {
            let topic = hook.command_topic();
            let handler_hook = Arc::clone(hook);
            let client = self.client.downgrade();
            let id = self.client.subscribe_to_topic(topic.clone(), move |message| {
                if let Some(client) = client.upgrade() {
                    handler_hook.handle(&client, message.payload);
                }
            });
            subscriptions.push((topic, id));
        }

        if let Some(hook) = &self.beat {
            let topic = hook.command_topic();
            let handler_hook = Arc::clone(hook);
            let client = self.client.downgrade();
            let id = self.client.subscribe_to_topic(topic.clone(), move |message| {
                if let Some(client) = client.upgrade() {
                    handler_hook.handle(&client, message.payload);
                }
            });
            subscriptions.push((topic, id));
        }
    }

    fn detach(&self) {
        let subscriptions = std::mem::take(&mut *lock(&self.subscriptions));
        for (topic, id) in subscriptions {
            self.client.unsubscribe_from_topic(&topic, id);
        }
    }
}

async fn report_on_connect(
    mut connected: watch::Receiver<bool>,
    client: WeakMessageClient,
    volume: Option<Arc<VolumeHook>>,
    beat: Option<Arc<BeatHook>>,
) {
    loop {
        if *connected.borrow_and_update() {
            let Some(client) = client.upgrade() else {
                break;
            };
            if let Some(hook) = &volume {
                hook.report(&client);
            }
            if let Some(hook) = &beat {
                hook.report(&client);
            }
            debug!("Reported state for {} after connect", client.device_id());
        }

        if connected.changed().await.is_err() {
            break;
        }
    }
}
