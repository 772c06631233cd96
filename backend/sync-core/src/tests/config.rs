use crate::config::{ENV_BROKER_TOKEN, ENV_ROLE, ENV_TARGET_EXHIBITS, Role, SyncConfig};
use crate::error::config::ConfigError;

use std::collections::HashMap;
use std::time::Duration;

use tempfile::TempDir;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

/// **VALUE**: Verifies the defaults form a valid display configuration.
#[test]
fn given_default_config_when_validated_then_ok() {
    let config = SyncConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.identity.role, Role::Display);
    assert_eq!(config.content_timeout(), Duration::from_millis(3_500));
    assert_eq!(config.broker.url, "ws://127.0.0.1:1883");
}

/// **VALUE**: Verifies identifiers with topic-reserved characters are rejected.
///
/// **WHY THIS MATTERS**: An exhibit id of `basecamp/2` would silently add a topic segment and
/// the exhibit would never see its commands.
#[test]
fn given_exhibit_id_with_slash_when_validated_then_validation_error() {
    let mut config = SyncConfig::default();
    config.identity.exhibit_id = String::from("basecamp/2");

    let result = config.validate();

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

/// **VALUE**: Verifies the remaining validation rules.
#[test]
fn given_invalid_values_when_validated_then_each_rejected() {
    let mut config = SyncConfig::default();
    config.broker.url = String::from("http://hub:1883");
    assert!(config.validate().is_err());

    let mut config = SyncConfig::default();
    config.content.timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = SyncConfig::default();
    config.broker.reconnect_initial_ms = 60_000;
    assert!(config.validate().is_err());

    let mut config = SyncConfig::default();
    config.identity.role = Role::Docent;
    assert!(config.validate().is_err());

    let mut config = SyncConfig::default();
    config.identity.environment = String::from(" ");
    assert!(config.validate().is_err());
}

/// **VALUE**: Verifies environment overrides, including the comma separated target list.
#[test]
fn given_env_overrides_when_applied_then_config_updated() {
    // GIVEN
    let mut config = SyncConfig::default();
    let env = lookup(&[
        (ENV_ROLE, "Docent"),
        (ENV_TARGET_EXHIBITS, "basecamp, overlook,,summit"),
        (ENV_BROKER_TOKEN, "s3cret"),
        ("KIOSK_EXHIBIT_ID", "docent"),
        ("KIOSK_CONTENT_URL", ""),
    ]);

    // WHEN
    config.apply_env_from(env).unwrap();

    // THEN
    assert_eq!(config.identity.role, Role::Docent);
    assert_eq!(config.identity.exhibit_id, "docent");
    assert_eq!(config.docent.targets, ["basecamp", "overlook", "summit"]);
    assert_eq!(config.broker.token.as_ref().map(|t| t.expose()), Some("s3cret"));
    assert_eq!(config.content.url, None);
    assert!(config.identity.device_id.as_deref().unwrap().starts_with("docent-"));
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies an unknown role in the environment is an error, not a silent default.
#[test]
fn given_unknown_role_when_env_applied_then_env_error() {
    let mut config = SyncConfig::default();

    let result = config.apply_env_from(lookup(&[(ENV_ROLE, "projector")]));

    match result {
        Err(ConfigError::EnvError { variable, .. }) => assert_eq!(variable, ENV_ROLE),
        other => panic!("expected EnvError, got {other:?}"),
    }
}

/// **VALUE**: Verifies save/load keeps settings and never writes the broker token.
///
/// **BUG THIS CATCHES**: Would catch the credential leaking into a config file that gets
/// copied between kiosks.
#[test]
fn given_config_with_token_when_saved_and_loaded_then_token_not_persisted() {
    // GIVEN
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("kiosk.toml");
    let mut config = SyncConfig::default();
    config.identity.exhibit_id = String::from("summit");
    config.identity.device_id = Some(String::from("summit-7"));
    config.broker.token = Some(common::RedactedToken::new("s3cret"));

    // WHEN
    config.save(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    let loaded = SyncConfig::load(&path).unwrap();

    // THEN
    assert!(!contents.contains("s3cret"));
    assert_eq!(loaded.identity.exhibit_id, "summit");
    assert_eq!(loaded.device_id(), "summit-7");
    assert!(loaded.broker.token.is_none());
}

/// **VALUE**: Verifies a missing file yields defaults with a generated device id.
#[test]
fn given_missing_file_when_loaded_then_defaults() {
    let dir = TempDir::new().unwrap();

    let config = SyncConfig::load(&dir.path().join("kiosk.toml")).unwrap();

    assert_eq!(config.identity.exhibit_id, "basecamp");
    assert!(config.device_id().starts_with("basecamp-"));
}

/// **VALUE**: Verifies a corrupt file is reported as a parse error.
#[test]
fn given_corrupt_file_when_loaded_then_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kiosk.toml");
    std::fs::write(&path, "[identity\nexhibit_id = ").unwrap();

    let result = SyncConfig::load(&path);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies partial files fill missing sections from defaults.
#[test]
fn given_partial_file_when_loaded_then_missing_sections_defaulted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kiosk.toml");
    std::fs::write(
        &path,
        "[identity]\nexhibit_id = \"overlook\"\n\n[topics]\ncommand_prefix = \"command\"\n",
    )
    .unwrap();

    let config = SyncConfig::load(&path).unwrap();

    assert_eq!(config.identity.environment, "dev");
    assert_eq!(
        config.topics().command("overlook", "goto-beat"),
        "command/dev/overlook/goto-beat"
    );
    assert_eq!(config.content.timeout_ms, 3_500);
}
