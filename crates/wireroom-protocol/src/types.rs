//! Core protocol types for Wireroom's wire format.
//!
//! Every message on the wire is an [`Envelope`]: a declared type tag plus a
//! JSON payload. The tag `"ERROR"` is reserved for protocol-level error
//! signaling, so the envelope is modeled as a tagged variant rather than a
//! plain string field — an [`Envelope::Application`] can never be confused
//! with an [`Envelope::ProtocolError`] by a typo in a string comparison.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The reserved wire tag for protocol-level error envelopes.
///
/// It is still an ordinary key for listener registration: `on("ERROR", ..)`
/// observes error envelopes exactly like any other message type.
pub const ERROR_ID: &str = "ERROR";

/// Separates the message id from the payload on the wire.
/// Not permitted inside a message id.
pub const DELIMITER: char = '|';

/// The wire token representing "no payload".
///
/// JSON has no way to say "undefined" (as opposed to `null`), so the codec
/// writes this bare token instead. It is distinct from every valid JSON
/// value — the JSON *string* `undefined` serializes as `"undefined"`,
/// quotes included.
pub(crate) const UNDEFINED_TOKEN: &str = "undefined";

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected client.
///
/// Newtype over a v4 UUID. Issued once per connection at connect time
/// (unless the transport integration supplies one explicitly) and immutable
/// for the connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Issues a fresh random client id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a room, generated at room creation.
///
/// Doubles as the room's pub/sub topic name (its hyphenated string form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub Uuid);

impl RoomId {
    /// Issues a fresh random room id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The data half of an envelope: any JSON value, or no value at all.
///
/// `Undefined` is a first-class state rather than an `Option` so the codec
/// round-trip law holds for it too: a message sent with no payload decodes
/// back to `Payload::Undefined`, not to JSON `null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No payload was attached to the message.
    #[default]
    Undefined,

    /// An arbitrary JSON value.
    Value(serde_json::Value),
}

impl Payload {
    /// Renders the payload as its wire segment: compact JSON, or the
    /// `undefined` token.
    pub fn to_wire(&self) -> Result<String, crate::ProtocolError> {
        match self {
            Self::Undefined => Ok(UNDEFINED_TOKEN.to_string()),
            Self::Value(v) => Ok(serde_json::to_string(v)?),
        }
    }

    /// Parses a wire segment. `None` if the segment is neither the
    /// `undefined` token nor valid JSON.
    pub fn from_wire(segment: &str) -> Option<Self> {
        if segment == UNDEFINED_TOKEN {
            return Some(Self::Undefined);
        }
        serde_json::from_str(segment).ok().map(Self::Value)
    }

    /// Borrows the inner JSON value, if any.
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Undefined => None,
            Self::Value(v) => Some(v),
        }
    }

    /// Convenience: the payload as a string slice, if it is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(|v| v.as_str())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Value(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Value(serde_json::Value::String(value))
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The unit exchanged over the wire: a type tag plus a payload.
///
/// The reserved `"ERROR"` tag gets its own variant so protocol-level error
/// signaling is distinguished by the type system, not by string equality
/// scattered through the dispatch path. Both variants travel through the
/// same codec and the same listener mechanism.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// An application message with a caller-chosen type tag.
    Application {
        /// The declared message type. Never contains [`DELIMITER`] and is
        /// never the literal `"ERROR"`.
        id: String,
        /// The message payload.
        data: Payload,
    },

    /// A protocol-level error report (wire tag `"ERROR"`).
    ProtocolError {
        /// Whatever the signaling side attached — usually a string, but
        /// peers may send any JSON value under the error tag.
        detail: Payload,
    },
}

impl Envelope {
    /// Builds an application envelope, validating the id.
    ///
    /// An id equal to the reserved `"ERROR"` tag is normalized to the
    /// [`Envelope::ProtocolError`] variant so the two can never diverge.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessageId`](crate::ProtocolError::InvalidMessageId)
    /// if the id contains the wire delimiter.
    pub fn application(
        id: impl Into<String>,
        data: impl Into<Payload>,
    ) -> Result<Self, crate::ProtocolError> {
        let id = id.into();
        if id.contains(DELIMITER) {
            return Err(crate::ProtocolError::InvalidMessageId(id));
        }
        if id == ERROR_ID {
            return Ok(Self::ProtocolError {
                detail: data.into(),
            });
        }
        Ok(Self::Application {
            id,
            data: data.into(),
        })
    }

    /// Builds a protocol error envelope carrying a text description.
    pub fn error(text: impl Into<String>) -> Self {
        Self::ProtocolError {
            detail: Payload::from(text.into()),
        }
    }

    /// The wire tag of this envelope (`"ERROR"` for the error variant).
    pub fn id(&self) -> &str {
        match self {
            Self::Application { id, .. } => id,
            Self::ProtocolError { .. } => ERROR_ID,
        }
    }

    /// The payload of this envelope.
    pub fn data(&self) -> &Payload {
        match self {
            Self::Application { data, .. } => data,
            Self::ProtocolError { detail } => detail,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
