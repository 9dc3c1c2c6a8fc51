//! Client registry for Wireroom.
//!
//! Maps stable [`ClientId`]s to live connections plus whatever state the
//! application attaches per client. Everything above the transport —
//! rooms, broadcast, the dispatch layer — addresses clients through this
//! crate rather than holding connections directly.
//!
//! [`ClientId`]: wireroom_protocol::ClientId

mod error;
mod handle;
mod registry;

pub use error::RegistryError;
pub use handle::ClientHandle;
pub use registry::Registry;
