//! Transport abstraction layer for Wireroom.
//!
//! Provides the [`Transport`] and [`Connection`] traits that the relay
//! core is written against, plus the default WebSocket implementation.
//!
//! The boundary contract the core requires from a transport:
//!
//! - a per-connection `send(bytes)` primitive;
//! - an event feed: accepted connections, `recv` (message / clean close /
//!   error);
//! - optionally, native topic publish/subscribe used to accelerate room
//!   and whole-server broadcast. Transports without it simply leave the
//!   default trait methods in place and the core falls back to iterating
//!   members directly — same observable result, more sends.
//!
//! # Feature flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod broker;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use broker::TopicBroker;
pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a transport-level connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), TransportError>;
}

/// A single connection that can send and receive frames.
pub trait Connection: Send + Sync + 'static {
    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Subscribes this connection to a named topic.
    ///
    /// Default: no-op, for transports without native pub/sub.
    async fn subscribe(&self, _topic: &str) -> Result<(), TransportError> {
        Ok(())
    }

    /// Removes this connection from a named topic.
    ///
    /// Default: no-op.
    async fn unsubscribe(&self, _topic: &str) -> Result<(), TransportError> {
        Ok(())
    }

    /// Publishes data to every *other* live subscriber of the topic —
    /// the publishing connection is excluded, so a caller that wants the
    /// publisher included must follow up with one direct [`send`](Self::send).
    ///
    /// Returns `Ok(false)` when the transport has no native pub/sub; the
    /// caller must then fan out by iterating recipients itself.
    async fn publish(
        &self,
        _topic: &str,
        _data: &[u8],
    ) -> Result<bool, TransportError> {
        Ok(false)
    }
}
