//! Message brokers.
//!
//! [`MemoryBroker`] routes in-process; [`start_hub`] serves the same routing
//! over WebSocket for kiosks on the exhibit network.

mod handle;
mod hub;
mod memory;
pub(crate) mod router;
pub(crate) mod session;

pub use handle::HubHandle;
pub use hub::{start_hub, start_hub_with_hello_timeout};
pub use memory::MemoryBroker;
