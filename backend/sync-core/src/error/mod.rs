pub mod config;
pub mod content;
pub mod navigation;
pub mod protocol;
pub mod transport;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Transport(#[from] transport::TransportError),

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    Navigation(#[from] navigation::NavigationError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Content(#[from] content::ContentError),
}
