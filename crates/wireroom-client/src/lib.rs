//! Peer-side client for Wireroom.
//!
//! Mirrors the server's surface from the other end of the wire: typed
//! `send(id, data)` out, per-ID listeners in, and lifecycle callbacks
//! for open, close, and transport errors. Uses the same codec and
//! router crates as the server, so both ends speak and dispatch
//! identically.

mod client;
mod error;

pub use client::{Client, ClientEvents, CloseHook, ErrorHook, OpenHook};
pub use error::ClientError;

pub use wireroom_protocol::{Envelope, Payload, ERROR_ID};
pub use wireroom_router::{listener, Listener};
