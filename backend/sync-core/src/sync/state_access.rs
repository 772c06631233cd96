//! Explicit read/write access to exhibit state.
//!
//! Hooks never capture state directly. They are handed a [`StateAccess`]
//! and read the latest value through it on every message.

use std::sync::Arc;

use tokio::sync::watch;

pub trait StateAccess<S: Clone>: Send + Sync {
    fn get(&self) -> S;

    fn set(&self, value: S);

    /// Replace the value with `f(current)` and return the new value.
    fn update(&self, f: &dyn Fn(&S) -> S) -> S {
        let next = f(&self.get());
        self.set(next.clone());
        next
    }
}

/// Default [`StateAccess`]: a cloneable cell whose changes can be observed
/// (e.g. by the render layer) through [`SharedState::watch`].
#[derive(Debug, Clone)]
pub struct SharedState<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> SharedState<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
        }
    }

    pub fn watch(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

impl<S: Default> Default for SharedState<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> StateAccess<S> for SharedState<S>
where
    S: Clone + Send + Sync,
{
    fn get(&self) -> S {
        self.tx.borrow().clone()
    }

    fn set(&self, value: S) {
        self.tx.send_replace(value);
    }

    fn update(&self, f: &dyn Fn(&S) -> S) -> S {
        let mut next = None;
        self.tx.send_modify(|current| {
            *current = f(current);
            next = Some(current.clone());
        });
        next.unwrap_or_else(|| self.get())
    }
}
