//! Wire protocol for Wireroom.
//!
//! This crate defines the "language" that peers and the relay server speak:
//!
//! - **Types** ([`Envelope`], [`Payload`], [`ClientId`], [`RoomId`]) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`Base64Codec`]) — how an envelope is
//!   converted to/from its wire string.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the routing
//! layers (registry, router, rooms). It doesn't know about connections or
//! rooms — it only knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Router (typed dispatch)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Base64Codec, Codec};
pub use error::ProtocolError;
pub use types::{ClientId, Envelope, Payload, RoomId, DELIMITER, ERROR_ID};
