use crate::error::config::ConfigError;
use crate::protocol::topics::{DEFAULT_COMMAND_PREFIX, DEFAULT_STATE_PREFIX, Topics};
use crate::transport::client::ReconnectPolicy;

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONFIG_FILE_NAME: &str = "kiosk.toml";
const CONFIG_VERSION: u32 = 1;

pub const ENV_ENVIRONMENT: &str = "KIOSK_ENVIRONMENT";
pub const ENV_EXHIBIT_ID: &str = "KIOSK_EXHIBIT_ID";
pub const ENV_DEVICE_ID: &str = "KIOSK_DEVICE_ID";
pub const ENV_BROKER_URL: &str = "KIOSK_BROKER_URL";
pub const ENV_BROKER_TOKEN: &str = "KIOSK_BROKER_TOKEN";
pub const ENV_ROLE: &str = "KIOSK_ROLE";
pub const ENV_TARGET_EXHIBITS: &str = "KIOSK_TARGET_EXHIBITS";
pub const ENV_CONTENT_URL: &str = "KIOSK_CONTENT_URL";
pub const ENV_CONTENT_PATH: &str = "KIOSK_CONTENT_PATH";

const RESERVED_TOPIC_CHARS: [char; 3] = ['/', '+', '#'];

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Runs only the broker hub.
    Hub,
    /// Mirrors one exhibit.
    #[default]
    Display,
    /// Drives the target exhibits.
    Docent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hub => "hub",
            Role::Display => "display",
            Role::Docent => "docent",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "hub" => Some(Role::Hub),
            "display" => Some(Role::Display),
            "docent" => Some(Role::Docent),
            _ => None,
        }
    }
}

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_exhibit_id")]
    pub exhibit_id: String,
    /// Generated from the exhibit id on load when absent.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            exhibit_id: default_exhibit_id(),
            device_id: None,
            role: Role::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_url")]
    pub url: String,
    /// Never written back to disk.
    #[serde(default, skip_serializing)]
    pub token: Option<RedactedToken>,
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            token: None,
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_state_prefix")]
    pub state_prefix: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            state_prefix: default_state_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_hub_bind")]
    pub bind: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_hub_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Static content file; also the fallback when the fetch fails.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_content_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            timeout_ms: default_content_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocentConfig {
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub topics: TopicsConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub docent: DocentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            identity: IdentityConfig::default(),
            broker: BrokerConfig::default(),
            topics: TopicsConfig::default(),
            hub: HubConfig::default(),
            content: ContentConfig::default(),
            docent: DocentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_environment() -> String {
    "dev".to_string()
}
fn default_exhibit_id() -> String {
    "basecamp".to_string()
}
fn default_broker_url() -> String {
    crate::DEFAULT_BROKER_URL.to_string()
}
fn default_reconnect_initial_ms() -> u64 {
    500
}
fn default_reconnect_max_ms() -> u64 {
    30_000
}
fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}
fn default_state_prefix() -> String {
    DEFAULT_STATE_PREFIX.to_string()
}
fn default_hub_bind() -> String {
    crate::DEFAULT_HUB_BIND.to_string()
}
fn default_content_timeout_ms() -> u64 {
    3_500
}
fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

// ============================================
// IMPLEMENTATION
// ============================================

impl SyncConfig {
    /// Load config from a TOML file.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or fails validation.
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(config_path)?;
        config.resolve_device_id();
        config.validate()?;
        Ok(config)
    }

    /// [`SyncConfig::load`] with environment overrides applied before
    /// validation.
    ///
    /// # Errors
    ///
    /// See [`SyncConfig::load`] and [`SyncConfig::apply_env_from`].
    pub fn load_with_env(config_path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(config_path)?;
        config.apply_env_from(|variable| std::env::var(variable).ok())?;
        config.validate()?;
        Ok(config)
    }

    #[track_caller]
    fn read(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.to_path_buf(),
                source: e,
            }
        })?;

        let config: SyncConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Apply `KIOSK_*` overrides obtained through `lookup`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvError`] for an unknown role.
    #[track_caller]
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |variable: &str| lookup(variable).filter(|value| !value.trim().is_empty());

        if let Some(environment) = get(ENV_ENVIRONMENT) {
            self.identity.environment = environment;
        }
        if let Some(exhibit_id) = get(ENV_EXHIBIT_ID) {
            self.identity.exhibit_id = exhibit_id;
        }
        if let Some(device_id) = get(ENV_DEVICE_ID) {
            self.identity.device_id = Some(device_id);
        }
        if let Some(role) = get(ENV_ROLE) {
            self.identity.role = Role::parse(&role).ok_or_else(|| ConfigError::EnvError {
                location: ErrorLocation::from(Location::caller()),
                variable: ENV_ROLE.to_string(),
                reason: format!("unknown role '{role}' (expected hub, display or docent)"),
            })?;
        }
        if let Some(url) = get(ENV_BROKER_URL) {
            self.broker.url = url;
        }
        if let Some(token) = get(ENV_BROKER_TOKEN) {
            self.broker.token = Some(RedactedToken::new(token));
        }
        if let Some(targets) = get(ENV_TARGET_EXHIBITS) {
            self.docent.targets = targets
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = get(ENV_CONTENT_URL) {
            self.content.url = Some(url);
        }
        if let Some(path) = get(ENV_CONTENT_PATH) {
            self.content.path = Some(PathBuf::from(path));
        }

        self.resolve_device_id();
        Ok(())
    }

    fn resolve_device_id(&mut self) {
        if self.identity.device_id.is_none() {
            let suffix = Uuid::new_v4().simple().to_string();
            let device_id = format!("{}-{}", self.identity.exhibit_id, &suffix[..8]);
            info!("No device id configured, using {device_id}");
            self.identity.device_id = Some(device_id);
        }
    }

    /// Save config using atomic write (temp file + rename). The broker token
    /// is not written.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, serialization, the write or
    /// the rename fails.
    #[track_caller]
    pub fn save(&self, config_path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                location: ErrorLocation::from(Location::caller()),
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut temp_name = config_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.to_path_buf(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason,
        };

        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(invalid(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        let mut segments = vec![
            ("identity.environment", self.identity.environment.as_str()),
            ("identity.exhibit_id", self.identity.exhibit_id.as_str()),
            ("topics.command_prefix", self.topics.command_prefix.as_str()),
            ("topics.state_prefix", self.topics.state_prefix.as_str()),
        ];
        if let Some(device_id) = &self.identity.device_id {
            segments.push(("identity.device_id", device_id.as_str()));
        }
        for target in &self.docent.targets {
            segments.push(("docent.targets", target.as_str()));
        }

        for (field, value) in segments {
            if value.trim().is_empty() {
                return Err(invalid(format!("{field} cannot be empty")));
            }
            if value.contains(RESERVED_TOPIC_CHARS) {
                return Err(invalid(format!(
                    "{field} '{value}' must not contain '/', '+' or '#'"
                )));
            }
        }

        if self.topics.command_prefix == self.topics.state_prefix {
            return Err(invalid(String::from(
                "topics.command_prefix and topics.state_prefix must differ",
            )));
        }

        if !self.broker.url.starts_with("ws://") && !self.broker.url.starts_with("wss://") {
            return Err(invalid(format!(
                "Invalid broker url: {} (must start with ws:// or wss://)",
                self.broker.url
            )));
        }

        if self.broker.reconnect_initial_ms == 0
            || self.broker.reconnect_initial_ms > self.broker.reconnect_max_ms
        {
            return Err(invalid(format!(
                "Invalid reconnect intervals: initial {}ms, max {}ms",
                self.broker.reconnect_initial_ms, self.broker.reconnect_max_ms
            )));
        }

        if self.content.timeout_ms == 0 {
            return Err(invalid(String::from("content.timeout_ms must be positive")));
        }

        if let Some(url) = &self.content.url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(invalid(format!("Invalid content url: {url}")));
        }

        if self.identity.role == Role::Docent && self.docent.targets.is_empty() {
            return Err(invalid(String::from(
                "docent role requires at least one docent.targets entry",
            )));
        }

        Ok(())
    }

    pub fn device_id(&self) -> String {
        self.identity
            .device_id
            .clone()
            .unwrap_or_else(|| self.identity.exhibit_id.clone())
    }

    pub fn topics(&self) -> Topics {
        Topics::with_prefixes(
            self.topics.command_prefix.clone(),
            self.topics.state_prefix.clone(),
            self.identity.environment.clone(),
        )
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_interval: Duration::from_millis(self.broker.reconnect_initial_ms),
            max_interval: Duration::from_millis(self.broker.reconnect_max_ms),
            ..ReconnectPolicy::default()
        }
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content.timeout_ms)
    }
}
