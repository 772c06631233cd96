use crate::broker::session::SessionState;

use common::RedactedToken;

/// **VALUE**: Verifies an open hub accepts any non-empty client id.
#[test]
fn given_no_expected_token_when_hello_then_accepted() {
    let mut state = SessionState::new(None);

    assert!(state.accept_hello("basecamp-1", None).is_ok());
    assert_eq!(state.client_id(), Some("basecamp-1"));
}

/// **VALUE**: Verifies token checks on a protected hub.
///
/// **BUG THIS CATCHES**: Would catch a missing token being treated as a match.
#[test]
fn given_expected_token_when_hello_then_only_matching_token_accepted() {
    let mut state = SessionState::new(Some(RedactedToken::new("s3cret")));

    assert_eq!(state.accept_hello("summit-1", None), Err("token required"));
    assert_eq!(state.accept_hello("summit-1", Some("guess")), Err("invalid token"));
    assert!(state.client_id().is_none());
    assert!(state.accept_hello("summit-1", Some("s3cret")).is_ok());
}

/// **VALUE**: Verifies blank client ids are refused.
#[test]
fn given_blank_client_id_when_hello_then_rejected() {
    let mut state = SessionState::new(None);

    assert!(state.accept_hello("  ", None).is_err());
}
