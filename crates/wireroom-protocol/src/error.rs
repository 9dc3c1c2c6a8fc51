//! Error types for the protocol layer.
//!
//! Each crate in Wireroom defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in message construction or
//! serialization, not in networking or room management.
//!
//! Note that *decoding* has no error variant at all:
//! [`Codec::decode`](crate::Codec::decode) returns `None` for anything
//! malformed. A relay
//! must shrug off arbitrary garbage from the network, so decode failure is
//! an expected outcome, not an error to propagate.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of a payload to JSON failed.
    ///
    /// Rare in practice — `serde_json::Value` always serializes — but the
    /// codec surface stays fallible so alternative payload sources can
    /// report their own failures.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The message id contains the wire delimiter character.
    ///
    /// The delimiter separates the id from the payload on the wire, so an
    /// id containing it could never round-trip.
    #[error("message id {0:?} contains the wire delimiter")]
    InvalidMessageId(String),
}
