//! Codec trait and the base64 wire codec.
//!
//! A "codec" (coder/decoder) converts between an [`Envelope`] and its wire
//! string. The routing layers don't care HOW an envelope is framed — they
//! go through the [`Codec`] trait, so a different framing can be swapped in
//! without touching registry, router, or room code.
//!
//! The wire format is:
//!
//! ```text
//! base64( <id> '|' <compact JSON or the `undefined` token> )
//! ```
//!
//! Decoding is total: any input that is not a well-formed envelope yields
//! `None`. The relay answers malformed frames over the wire instead of
//! propagating an error up the stack.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::{Envelope, Payload, ProtocolError, DELIMITER, ERROR_ID};

/// Converts envelopes to and from their wire representation.
///
/// `Send + Sync + 'static` because one codec value is shared by every
/// connection handler task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an envelope into its wire string.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the payload fails to serialize.
    fn encode(&self, envelope: &Envelope) -> Result<String, ProtocolError>;

    /// Parses a wire string back into an envelope.
    ///
    /// Returns `None` — never panics, never errors — when the input is not
    /// valid base64, not UTF-8 underneath, missing the delimiter, or
    /// carries a payload segment that is neither JSON nor the `undefined`
    /// token.
    fn decode(&self, wire: &str) -> Option<Envelope>;
}

/// The standard Wireroom codec: `base64(id|payload)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl Codec for Base64Codec {
    fn encode(&self, envelope: &Envelope) -> Result<String, ProtocolError> {
        let payload = envelope.data().to_wire()?;
        let mut plain =
            String::with_capacity(envelope.id().len() + 1 + payload.len());
        plain.push_str(envelope.id());
        plain.push(DELIMITER);
        plain.push_str(&payload);
        Ok(STANDARD.encode(plain))
    }

    fn decode(&self, wire: &str) -> Option<Envelope> {
        let bytes = STANDARD.decode(wire).ok()?;
        let plain = String::from_utf8(bytes).ok()?;
        // Split at the FIRST delimiter only: the JSON payload is free to
        // contain the delimiter character itself.
        let (id, payload) = plain.split_once(DELIMITER)?;
        let data = Payload::from_wire(payload)?;
        if id == ERROR_ID {
            return Some(Envelope::ProtocolError { detail: data });
        }
        Some(Envelope::Application {
            id: id.to_string(),
            data,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
