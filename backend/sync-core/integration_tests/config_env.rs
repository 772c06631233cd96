//! Environment overrides read from the real process environment.
//!
//! Serialized because the environment is process-wide.

use sync_core::config::{
    ENV_BROKER_TOKEN, ENV_CONTENT_URL, ENV_DEVICE_ID, ENV_EXHIBIT_ID, ENV_ROLE,
    ENV_TARGET_EXHIBITS, Role, SyncConfig,
};
use sync_core::error::config::ConfigError;

use serial_test::serial;
use tempfile::TempDir;

const ALL: [&str; 6] = [
    ENV_BROKER_TOKEN,
    ENV_CONTENT_URL,
    ENV_DEVICE_ID,
    ENV_EXHIBIT_ID,
    ENV_ROLE,
    ENV_TARGET_EXHIBITS,
];

fn clear_env() {
    for variable in ALL {
        // SAFETY: tests touching the environment are #[serial].
        unsafe { std::env::remove_var(variable) };
    }
}

fn set_env(variable: &str, value: &str) {
    // SAFETY: tests touching the environment are #[serial].
    unsafe { std::env::set_var(variable, value) };
}

/// **VALUE**: Verifies environment variables override the file.
///
/// **WHY THIS MATTERS**: Each kiosk is imaged from the same config file; the
/// per-device identity comes from the environment.
#[test]
#[serial]
fn given_file_and_env_when_loaded_then_env_wins() {
    // GIVEN
    clear_env();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("kiosk.toml");
    std::fs::write(
        &file,
        "[identity]\nexhibit_id = \"overlook\"\nrole = \"display\"\n",
    )
    .unwrap();
    set_env(ENV_EXHIBIT_ID, "docent");
    set_env(ENV_ROLE, "docent");
    set_env(ENV_TARGET_EXHIBITS, "basecamp, summit,,");
    set_env(ENV_BROKER_TOKEN, "s3cret");

    // WHEN
    let config = SyncConfig::load_with_env(&file).unwrap();
    clear_env();

    // THEN
    assert_eq!(config.identity.exhibit_id, "docent");
    assert_eq!(config.identity.role, Role::Docent);
    assert_eq!(config.docent.targets, ["basecamp", "summit"]);
    assert!(config.broker.token.as_ref().unwrap().matches("s3cret"));
    assert!(config.device_id().starts_with("docent-"));
}

/// **VALUE**: Verifies blank variables are ignored rather than blanking settings.
#[test]
#[serial]
fn given_blank_env_when_loaded_then_file_value_kept() {
    // GIVEN
    clear_env();
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("kiosk.toml");
    std::fs::write(&file, "[identity]\ndevice_id = \"summit-7\"\n").unwrap();
    set_env(ENV_DEVICE_ID, "   ");

    // WHEN
    let config = SyncConfig::load_with_env(&file).unwrap();
    clear_env();

    // THEN
    assert_eq!(config.device_id(), "summit-7");
}

/// **VALUE**: Verifies a bad role names the variable; an override that breaks validation fails
/// the load.
#[test]
#[serial]
fn given_invalid_env_when_loaded_then_error() {
    // GIVEN
    clear_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    // WHEN
    set_env(ENV_ROLE, "projector");
    let bad_role = SyncConfig::load_with_env(&missing);
    clear_env();
    set_env(ENV_CONTENT_URL, "ftp://cms.local/content");
    let bad_url = SyncConfig::load_with_env(&missing);
    clear_env();

    // THEN
    assert!(matches!(
        bad_role,
        Err(ConfigError::EnvError { ref variable, .. }) if variable == ENV_ROLE
    ));
    assert!(matches!(bad_url, Err(ConfigError::ValidationError { .. })));
}
