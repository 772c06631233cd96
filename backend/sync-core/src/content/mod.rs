//! Content sequence loading.
//!
//! Content comes from a CMS endpoint when one is configured and from a
//! static JSON file otherwise. The static file doubles as the cached
//! fallback: any fetch failure (timeout, HTTP status, bad JSON, invalid
//! content) falls back to it.
//!
//! ```json
//! { "moments": [ { "id": "welcome", "title": "Welcome", "beats": [ {}, { "handle": "intro" } ] } ] }
//! ```

use crate::error::content::ContentError;

use common::ErrorLocation;
use models::{Sequence, SequenceBuilder};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(3_500);

#[derive(Debug, Deserialize)]
struct ContentDocument {
    moments: Vec<MomentDocument>,
}

#[derive(Debug, Deserialize)]
struct MomentDocument {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    beats: Vec<BeatDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct BeatDocument {
    #[serde(default)]
    handle: Option<String>,
}

/// Parse a content document into a validated [`Sequence`].
///
/// # Errors
///
/// Returns [`ContentError::Parse`] for malformed JSON and
/// [`ContentError::Invalid`] for content the sequence builder rejects.
#[track_caller]
pub fn parse_content(json: &str) -> Result<Sequence, ContentError> {
    let document: ContentDocument =
        serde_json::from_str(json).map_err(|e| ContentError::Parse {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let builder = document
        .moments
        .into_iter()
        .fold(SequenceBuilder::default(), |builder, moment| {
            let handles: Vec<_> = moment.beats.into_iter().map(|b| b.handle).collect();
            builder.with_moment_handles(moment.id, moment.title, handles)
        });

    Ok(builder.build()?)
}

pub struct ContentSource {
    path: Option<PathBuf>,
    url: Option<String>,
    http: reqwest::Client,
}

impl ContentSource {
    /// # Errors
    ///
    /// Returns [`ContentError::Fetch`] if the HTTP client cannot be built.
    #[track_caller]
    pub fn new(
        path: Option<PathBuf>,
        url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { path, url, http })
    }

    /// Static file only.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ContentError> {
        Self::new(Some(path.into()), None, DEFAULT_FETCH_TIMEOUT)
    }

    /// Fetch from `url` when configured, falling back to the static file.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if there is no static file to fall back to,
    /// the static file's error if it cannot be loaded, and
    /// [`ContentError::NoSource`] if neither is configured.
    pub async fn load(&self) -> Result<Sequence, ContentError> {
        let fetch_error = match &self.url {
            Some(url) => match self.fetch(url).await {
                Ok(sequence) => return Ok(sequence),
                Err(e) => {
                    warn!("Content fetch from {url} failed, falling back to static content: {e}");
                    Some(e)
                }
            },
            None => None,
        };

        match (&self.path, fetch_error) {
            (Some(path), _) => load_file(path),
            (None, Some(e)) => Err(e),
            (None, None) => Err(ContentError::NoSource {
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// # Errors
    ///
    /// Returns [`ContentError::Fetch`] for transport errors, timeouts and
    /// non-success statuses, or the errors of [`parse_content`].
    pub async fn fetch(&self, url: &str) -> Result<Sequence, ContentError> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let sequence = parse_content(&body)?;
        info!(
            "Fetched {} moments ({} beats) from {url}",
            sequence.len(),
            sequence.total_beats()
        );
        Ok(sequence)
    }
}

/// Load and parse a static content file.
///
/// # Errors
///
/// Returns [`ContentError::Read`] if the file cannot be read, or the errors
/// of [`parse_content`].
#[track_caller]
pub fn load_file(path: &Path) -> Result<Sequence, ContentError> {
    let json = std::fs::read_to_string(path).map_err(|e| ContentError::Read {
        location: ErrorLocation::from(Location::caller()),
        path: path.to_path_buf(),
        source: e,
    })?;

    let sequence = parse_content(&json)?;
    info!(
        "Loaded {} moments ({} beats) from {}",
        sequence.len(),
        sequence.total_beats(),
        path.display()
    );
    Ok(sequence)
}
