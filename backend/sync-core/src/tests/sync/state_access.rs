use crate::sync::state_access::{SharedState, StateAccess};

/// **VALUE**: Verifies updates are visible through clones and watchers.
///
/// **WHY THIS MATTERS**: The render layer watches the same state the hooks write; a copy
/// instead of a share would leave the screen stale.
#[test]
fn given_shared_state_when_updated_then_clones_and_watchers_see_it() {
    // GIVEN
    let state = SharedState::new(1_u32);
    let clone = state.clone();
    let watcher = state.watch();

    // WHEN
    let next = state.update(&|current| current + 1);

    // THEN
    assert_eq!(next, 2);
    assert_eq!(clone.get(), 2);
    assert_eq!(*watcher.borrow(), 2);
    assert!(watcher.has_changed().unwrap());
}

/// **VALUE**: Verifies `set` replaces the value.
#[test]
fn given_shared_state_when_set_then_get_returns_new_value() {
    let state: SharedState<String> = SharedState::default();

    state.set(String::from("welcome-2"));

    assert_eq!(state.get(), "welcome-2");
}
