use wireroom_protocol::RoomId;

/// Errors from room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A room must be created with at least one member.
    #[error("a room needs at least one member")]
    NoMembers,

    /// No room with this ID exists.
    #[error("unknown room: {0}")]
    NotFound(RoomId),
}
