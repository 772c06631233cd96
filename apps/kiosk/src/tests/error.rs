// Unit tests for error module
// Library errors are flattened into kiosk errors at the call site

use crate::error::KioskError;

use sync_core::error::config::ConfigError;
use sync_core::error::transport::TransportError;
use sync_core::transport::WsConnector;

/// **VALUE**: Verifies library errors keep their message when converted.
///
/// **WHY THIS MATTERS**: The kiosk prints one line on fatal startup errors. If the
/// conversion dropped the library message, staff would see "Transport Error" with no hint
/// that the broker URL is wrong.
///
/// **BUG THIS CATCHES**: Would catch a `From` impl that formats the wrong field.
#[test]
fn given_transport_error_when_converted_then_message_kept() {
    // GIVEN: An invalid broker URL
    let err: TransportError = match WsConnector::new("http://hub.local:1883", None) {
        Err(e) => e,
        Ok(_) => panic!("http scheme must be rejected"),
    };

    // WHEN
    let kiosk = KioskError::from(err);

    // THEN
    let KioskError::Transport { message, .. } = &kiosk else {
        panic!("expected Transport, got {kiosk:?}");
    };
    assert!(message.contains("http://hub.local:1883"));
    assert!(kiosk.to_string().starts_with("Transport Error:"));
}

/// **VALUE**: Verifies the location points at the conversion site in this crate.
#[test]
fn given_config_error_when_converted_with_question_mark_then_location_is_kiosk() {
    // GIVEN
    fn load() -> Result<(), KioskError> {
        Err(ConfigError::ValidationError {
            location: common::ErrorLocation::from(std::panic::Location::caller()),
            reason: String::from("bad"),
        })?;
        Ok(())
    }

    // WHEN
    let err = load().unwrap_err();

    // THEN
    let KioskError::Config { location, .. } = &err else {
        panic!("expected Config, got {err:?}");
    };
    assert!(location.to_string().contains("error.rs"));
}

/// **VALUE**: Verifies console errors display only as console errors.
#[test]
fn given_console_error_when_displayed_then_prefixed() {
    let err = KioskError::console("unknown command 'jump'");

    assert!(err.to_string().starts_with("Console Error: unknown command 'jump'"));
}
