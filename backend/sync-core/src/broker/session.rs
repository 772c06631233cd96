//! Per-connection handshake state for the hub.

use common::RedactedToken;

/// Tracks whether a hub connection has completed its hello.
pub(crate) struct SessionState {
    client_id: Option<String>,
    expected_token: Option<RedactedToken>,
}

impl SessionState {
    pub(crate) fn new(expected_token: Option<RedactedToken>) -> Self {
        Self {
            client_id: None,
            expected_token,
        }
    }

    /// Accept a hello. With no expected token every hello is accepted.
    ///
    /// Returns the rejection reason on failure.
    pub(crate) fn accept_hello(
        &mut self,
        client_id: &str,
        token: Option<&str>,
    ) -> Result<(), &'static str> {
        if client_id.trim().is_empty() {
            return Err("client id must not be empty");
        }

        if let Some(expected) = &self.expected_token {
            match token {
                Some(presented) if expected.matches(presented) => {}
                Some(_) => return Err("invalid token"),
                None => return Err("token required"),
            }
        }

        self.client_id = Some(client_id.to_string());
        Ok(())
    }

    pub(crate) fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}
