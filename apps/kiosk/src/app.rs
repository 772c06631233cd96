//! Role wiring for the kiosk process.
//!
//! - `hub`: serve the broker hub until Ctrl-C
//! - `display`: sync one exhibit (volume, beat, availability)
//! - `docent`: drive target exhibits from the console
//!
//! Any role also hosts the hub when `[hub] enabled = true`.

use crate::error::KioskError;
use crate::session::DocentSession;

use sync_core::broker::{HubHandle, start_hub};
use sync_core::config::{Role, SyncConfig};
use sync_core::content::ContentSource;
use sync_core::navigation::NavigationController;
use sync_core::sync::{AvailabilityMonitor, LoggingAudioEngine, SharedState, SyncService};
use sync_core::transport::{ClientCallbacks, MessageClient, WsConnector};

use models::{NavigationState, Sequence, VolumeState};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::io::{BufReader, stdin, stdout};
use tokio::signal::ctrl_c;

/// Run the configured role until Ctrl-C (or `quit` on the docent console).
///
/// # Errors
///
/// Returns [`KioskError`] if the hub cannot bind, content cannot be loaded,
/// or the broker URL is invalid.
pub async fn run(config: SyncConfig) -> Result<(), KioskError> {
    let role = config.identity.role;
    info!(
        "Kiosk {} starting as {} for exhibit {} in {}",
        config.device_id(),
        role.as_str(),
        config.identity.exhibit_id,
        config.identity.environment
    );

    let hub = if role == Role::Hub || config.hub.enabled {
        Some(start_hub(&config.hub.bind, config.broker.token.clone()).await?)
    } else {
        None
    };

    let result = match role {
        Role::Hub => run_hub(hub.as_ref()).await,
        Role::Display => run_display(&config).await,
        Role::Docent => run_docent(&config).await,
    };

    if let Some(hub) = hub {
        hub.shutdown();
    }
    result
}

async fn wait_for_ctrl_c() -> Result<(), KioskError> {
    ctrl_c().await.map_err(|e| KioskError::Kiosk {
        message: format!("Failed to listen for Ctrl-C: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

async fn run_hub(hub: Option<&HubHandle>) -> Result<(), KioskError> {
    if let Some(hub) = hub {
        info!("Hub ready at {}", hub.url());
    }
    wait_for_ctrl_c().await?;
    info!("Ctrl-C received, stopping hub");
    Ok(())
}

fn connect_client(config: &SyncConfig) -> Result<MessageClient, KioskError> {
    let connector = WsConnector::new(&config.broker.url, config.broker.token.clone())?;
    let callbacks = ClientCallbacks::new()
        .on_connection_change(|connected| {
            if connected {
                info!("Broker connection up");
            } else {
                warn!("Broker connection down");
            }
        })
        .on_error(|e| {
            if !e.is_retryable() {
                error!("Broker refused this kiosk; check [broker] settings: {e}");
            }
        });

    Ok(MessageClient::new(
        config.device_id(),
        Arc::new(connector),
        callbacks,
        config.reconnect_policy(),
    ))
}

async fn load_sequence(config: &SyncConfig) -> Result<Arc<Sequence>, KioskError> {
    let source = ContentSource::new(
        config.content.path.clone(),
        config.content.url.clone(),
        config.content_timeout(),
    )?;
    let sequence = source.load().await?;
    info!(
        "Content ready: {} moments, {} beats",
        sequence.len(),
        sequence.total_beats()
    );
    Ok(Arc::new(sequence))
}

async fn run_display(config: &SyncConfig) -> Result<(), KioskError> {
    let sequence = load_sequence(config).await?;
    let start = sequence.first_state().ok_or_else(|| KioskError::Content {
        message: String::from("Content has no beats"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let position = SharedState::new(start);
    let volume = SharedState::new(VolumeState::default());
    let mut beats = position.watch();

    let service = SyncService::new(
        connect_client(config)?,
        config.topics(),
        config.identity.exhibit_id.clone(),
    )?
    .with_volume(Arc::new(volume), Arc::new(LoggingAudioEngine))
    .with_beat(sequence, Arc::new(position));
    service.start();

    let shown = tokio::spawn(async move {
        while beats.changed().await.is_ok() {
            let state: NavigationState = beats.borrow_and_update().clone();
            info!("Showing {}", state.beat_id());
        }
    });

    let result = wait_for_ctrl_c().await;
    info!("Stopping display");
    service.shutdown().await;
    shown.abort();
    result
}

async fn run_docent(config: &SyncConfig) -> Result<(), KioskError> {
    let sequence = load_sequence(config).await?;
    let client = connect_client(config)?;
    let topics = config.topics();
    let targets = config.docent.targets.clone();

    let service = SyncService::new(
        client.clone(),
        topics.clone(),
        config.identity.exhibit_id.clone(),
    )?;
    let session = DocentSession::new(
        NavigationController::new(client.clone(), topics.clone(), targets.clone(), sequence)?,
        AvailabilityMonitor::new(client, topics, targets),
    );
    service.start();

    let mut output = stdout();
    let result = tokio::select! {
        result = session.run_console(BufReader::new(stdin()), &mut output) => result,
        result = wait_for_ctrl_c() => {
            info!("Ctrl-C received");
            result
        }
    };

    info!("Stopping docent");
    drop(session);
    service.shutdown().await;
    result
}
