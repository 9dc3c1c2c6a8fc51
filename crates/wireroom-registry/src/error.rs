use wireroom_protocol::ClientId;

/// Errors from client registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No client with this ID is registered.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),
}
