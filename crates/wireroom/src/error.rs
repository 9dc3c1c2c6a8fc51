//! Unified error type for the Wireroom stack.

use wireroom_protocol::ProtocolError;
use wireroom_registry::RegistryError;
use wireroom_room::RoomError;
use wireroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Code written against the `wireroom` meta-crate deals with this one
/// type; `#[from]` on each variant lets `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum WireroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, invalid message ID).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (unknown client).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A room-level error (no members, not found).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An I/O error (e.g. querying the local address).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    use wireroom_protocol::{ClientId, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let wrapped: WireroomError = err.into();
        assert!(matches!(wrapped, WireroomError::Transport(_)));
        assert!(wrapped.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessageId("a|b".into());
        let wrapped: WireroomError = err.into();
        assert!(matches!(wrapped, WireroomError::Protocol(_)));
    }

    #[test]
    fn test_from_registry_error() {
        let err = RegistryError::UnknownClient(ClientId::random());
        let wrapped: WireroomError = err.into();
        assert!(matches!(wrapped, WireroomError::Registry(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::random());
        let wrapped: WireroomError = err.into();
        assert!(matches!(wrapped, WireroomError::Room(_)));
    }
}
