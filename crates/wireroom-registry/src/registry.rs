//! The client registry: every connected client, keyed by ID.
//!
//! # Concurrency note
//!
//! `Registry` is not thread-safe by itself — it uses a plain `HashMap`.
//! The server owns it behind a single async mutex and keeps lock scopes
//! short; handles cloned out of it stay valid after the lock drops.

use std::collections::HashMap;
use std::sync::Arc;

use wireroom_protocol::ClientId;
use wireroom_transport::Connection;

use crate::{ClientHandle, RegistryError};

/// Tracks all currently connected clients.
///
/// Registration is idempotent by design: [`get_or_create`] is the single
/// entry point, and calling it twice for the same ID returns the handle
/// that already exists instead of replacing it. A client therefore keeps
/// one identity and one attachment for its whole connection, no matter
/// how many code paths "register" it.
///
/// [`get_or_create`]: Registry::get_or_create
pub struct Registry<C, D> {
    clients: HashMap<ClientId, ClientHandle<C, D>>,
}

impl<C: Connection, D: Clone> Registry<C, D> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Returns the handle for `id`, registering the connection under a
    /// fresh entry if none exists yet.
    ///
    /// With `id: None` a random ID is minted, which always creates.
    pub fn get_or_create(
        &mut self,
        id: Option<ClientId>,
        conn: Arc<C>,
        data: D,
    ) -> ClientHandle<C, D> {
        let id = id.unwrap_or_else(ClientId::random);
        self.clients
            .entry(id)
            .or_insert_with(|| {
                tracing::debug!(client_id = %id, "client registered");
                ClientHandle::new(id, conn, data)
            })
            .clone()
    }

    /// Looks up a client's handle.
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] if no client with this ID exists.
    pub fn lookup(
        &self,
        id: ClientId,
    ) -> Result<ClientHandle<C, D>, RegistryError> {
        self.clients
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownClient(id))
    }

    /// Removes a client, returning its handle if it was registered.
    pub fn remove(&mut self, id: ClientId) -> Option<ClientHandle<C, D>> {
        let removed = self.clients.remove(&id);
        if removed.is_some() {
            tracing::debug!(client_id = %id, "client removed");
        }
        removed
    }

    /// Handles for every registered client, in no particular order.
    pub fn all(&self) -> Vec<ClientHandle<C, D>> {
        self.clients.values().cloned().collect()
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no clients are registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl<C: Connection, D: Clone> Default for Registry<C, D> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use wireroom_transport::{ConnectionId, TransportError};

    /// Minimal in-memory connection for registry tests. Send just counts.
    struct MockConnection {
        id: ConnectionId,
        sent: std::sync::Mutex<Vec<Vec<u8>>>,
    }

    impl MockConnection {
        fn new(id: u64) -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(id),
                sent: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    impl Connection for MockConnection {
        async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(None)
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            self.id
        }
    }

    fn registry() -> Registry<MockConnection, ()> {
        Registry::new()
    }

    #[test]
    fn test_get_or_create_new_client_registers_it() {
        let mut reg = registry();
        let conn = MockConnection::new(1);

        let handle = reg.get_or_create(None, conn, ());

        assert_eq!(reg.len(), 1);
        assert!(reg.lookup(handle.id()).is_ok());
    }

    #[test]
    fn test_get_or_create_same_id_returns_existing_handle() {
        let mut reg = registry();
        let id = ClientId::random();

        let first = reg.get_or_create(Some(id), MockConnection::new(1), ());
        let second = reg.get_or_create(Some(id), MockConnection::new(2), ());

        assert_eq!(first.id(), second.id());
        assert_eq!(reg.len(), 1, "re-registration must not duplicate");
        // The original connection wins; the second one is ignored.
        assert_eq!(second.connection().id(), ConnectionId::new(1));
    }

    #[test]
    fn test_get_or_create_without_id_mints_unique_ids() {
        let mut reg = registry();

        let a = reg.get_or_create(None, MockConnection::new(1), ());
        let b = reg.get_or_create(None, MockConnection::new(2), ());

        assert_ne!(a.id(), b.id());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_lookup_unknown_client_returns_error() {
        let reg = registry();
        let id = ClientId::random();

        let result = reg.lookup(id);

        assert!(matches!(
            result,
            Err(RegistryError::UnknownClient(missing)) if missing == id
        ));
    }

    #[test]
    fn test_remove_registered_client_returns_handle() {
        let mut reg = registry();
        let handle = reg.get_or_create(None, MockConnection::new(1), ());

        let removed = reg.remove(handle.id());

        assert!(removed.is_some());
        assert!(reg.is_empty());
        assert!(reg.lookup(handle.id()).is_err());
    }

    #[test]
    fn test_remove_unknown_client_returns_none() {
        let mut reg = registry();

        assert!(reg.remove(ClientId::random()).is_none());
    }

    #[test]
    fn test_all_returns_every_client() {
        let mut reg = registry();
        let a = reg.get_or_create(None, MockConnection::new(1), ());
        let b = reg.get_or_create(None, MockConnection::new(2), ());

        let mut ids: Vec<_> =
            reg.all().into_iter().map(|h| h.id()).collect();
        ids.sort_by_key(|id| id.0);
        let mut expected = vec![a.id(), b.id()];
        expected.sort_by_key(|id| id.0);

        assert_eq!(ids, expected);
    }

    #[test]
    fn test_handle_data_carries_attachment() {
        let mut reg: Registry<MockConnection, String> = Registry::new();
        let handle = reg.get_or_create(
            None,
            MockConnection::new(1),
            "lobby".to_string(),
        );

        assert_eq!(handle.data(), "lobby");
        // Clones observe the same attachment.
        assert_eq!(reg.lookup(handle.id()).unwrap().data(), "lobby");
    }

    #[tokio::test]
    async fn test_handle_send_encodes_through_codec() {
        use wireroom_protocol::{Base64Codec, Codec, Payload};

        let mut reg = registry();
        let conn = MockConnection::new(1);
        let handle = reg.get_or_create(None, Arc::clone(&conn), ());

        handle
            .send(&Base64Codec, "PING", Payload::from("hi"))
            .await
            .expect("send should succeed");

        let sent = conn.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let frame = String::from_utf8(sent[0].clone()).unwrap();
        let decoded = Base64Codec.decode(&frame).expect("should decode");
        assert_eq!(decoded.id(), "PING");
    }

    #[tokio::test]
    async fn test_handle_send_swallows_transport_failure() {
        use wireroom_protocol::{Base64Codec, Payload};

        /// A connection whose send always fails.
        struct DeadConnection;

        impl Connection for DeadConnection {
            async fn send(
                &self,
                _data: &[u8],
            ) -> Result<(), TransportError> {
                Err(TransportError::ConnectionClosed("gone".into()))
            }

            async fn recv(
                &self,
            ) -> Result<Option<Vec<u8>>, TransportError> {
                Ok(None)
            }

            async fn close(&self) -> Result<(), TransportError> {
                Ok(())
            }

            fn id(&self) -> ConnectionId {
                ConnectionId::new(9)
            }
        }

        let handle = ClientHandle::new(
            ClientId::random(),
            Arc::new(DeadConnection),
            (),
        );

        // Transport failure is logged, not raised.
        let result = handle
            .send(&Base64Codec, "PING", Payload::Undefined)
            .await;
        assert!(result.is_ok());
    }
}
