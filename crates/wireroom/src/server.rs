//! Server state, the `ServerHandle` API, and the WebSocket relay server.
//!
//! This ties all the layers together: transport → protocol → registry →
//! router → rooms. `ServerHandle` is the embedder-facing surface; the
//! `RelayServer` builder wraps it around the WebSocket transport and an
//! accept loop, and the event-bridge methods let embedders drive the
//! same state machine from their own transport instead.

use std::sync::Arc;

use tokio::sync::Mutex;

use wireroom_protocol::{
    Base64Codec, ClientId, Codec, Envelope, Payload, RoomId, ERROR_ID,
};
use wireroom_registry::{ClientHandle, Registry};
use wireroom_room::RoomTable;
use wireroom_router::{Listener, Router};
use wireroom_transport::{
    Connection, Transport, WebSocketConnection, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::WireroomError;

/// The implicit everyone-topic. Every client is subscribed on connect so
/// a whole-server broadcast is one publish on transports with native
/// pub/sub.
pub const ALL_TOPIC: &str = "all";

/// What a broadcast addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastTarget {
    /// Every connected client.
    All,
    /// The members of one room.
    Room(RoomId),
}

/// A message listener as the server sees it: which client sent the
/// message, plus its payload.
pub type ServerListener<C, D> = Listener<(ClientHandle<C, D>, Payload)>;

/// Fired after a client is registered and subscribed.
pub type ConnectedHook<C, D> = Arc<
    dyn Fn(ClientHandle<C, D>) -> futures_util::future::BoxFuture<'static, ()>
        + Send
        + Sync,
>;

/// Fired after a client is removed. Receives the removed handle when the
/// client was actually registered.
pub type DisconnectedHook<C, D> = Arc<
    dyn Fn(
            ClientId,
            Option<ClientHandle<C, D>>,
        ) -> futures_util::future::BoxFuture<'static, ()>
        + Send
        + Sync,
>;

/// Shared server state. One lock order throughout: registry before
/// rooms, and neither held while listeners or hooks run.
struct ServerInner<C, D, K> {
    registry: Mutex<Registry<C, D>>,
    rooms: Mutex<RoomTable>,
    router: Mutex<Router<(ClientHandle<C, D>, Payload)>>,
    connected: std::sync::Mutex<Option<ConnectedHook<C, D>>>,
    disconnected: std::sync::Mutex<Option<DisconnectedHook<C, D>>>,
    codec: K,
}

/// The embedder-facing server surface.
///
/// Cheap to clone; all clones share one registry, room table, and
/// listener table. `C` is the connection type, `D` the per-client
/// attachment, `K` the wire codec (base64 by default).
pub struct ServerHandle<C, D, K = Base64Codec> {
    inner: Arc<ServerInner<C, D, K>>,
}

impl<C, D, K> Clone for ServerHandle<C, D, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, D> ServerHandle<C, D, Base64Codec>
where
    C: Connection,
    D: Clone + Send + Sync + 'static,
{
    /// A fresh handle with the default base64 codec.
    pub fn new() -> Self {
        Self::with_codec(Base64Codec)
    }
}

impl<C, D> Default for ServerHandle<C, D, Base64Codec>
where
    C: Connection,
    D: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, D, K> ServerHandle<C, D, K>
where
    C: Connection,
    D: Clone + Send + Sync + 'static,
    K: Codec,
{
    pub fn with_codec(codec: K) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                registry: Mutex::new(Registry::new()),
                rooms: Mutex::new(RoomTable::new()),
                router: Mutex::new(Router::new()),
                connected: std::sync::Mutex::new(None),
                disconnected: std::sync::Mutex::new(None),
                codec,
            }),
        }
    }

    // --- Listener registration -----------------------------------------

    /// Registers a listener for a message-type ID.
    pub async fn on(&self, id: &str, listener: ServerListener<C, D>) {
        self.inner.router.lock().await.on(id, listener);
    }

    /// Removes a previously registered listener.
    pub async fn off(&self, id: &str, listener: &ServerListener<C, D>) {
        self.inner.router.lock().await.off(id, listener);
    }

    /// Installs the connected hook, replacing any previous one.
    pub fn on_connected(&self, hook: ConnectedHook<C, D>) {
        *self
            .inner
            .connected
            .lock()
            .expect("hook lock poisoned") = Some(hook);
    }

    /// Installs the disconnected hook, replacing any previous one.
    pub fn on_disconnected(&self, hook: DisconnectedHook<C, D>) {
        *self
            .inner
            .disconnected
            .lock()
            .expect("hook lock poisoned") = Some(hook);
    }

    // --- Outbound ------------------------------------------------------

    /// Sends an application message to one client.
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] if the client is not registered —
    /// a targeted send to nobody is a caller bug, never a silent drop.
    /// Transport-level delivery failures are logged, not raised.
    ///
    /// [`RegistryError::UnknownClient`]: wireroom_registry::RegistryError::UnknownClient
    pub async fn send(
        &self,
        client: ClientId,
        id: &str,
        data: impl Into<Payload>,
    ) -> Result<(), WireroomError> {
        let handle = self.inner.registry.lock().await.lookup(client)?;
        handle.send(&self.inner.codec, id, data.into()).await?;
        Ok(())
    }

    /// Delivers a message to every client the target names, exactly once
    /// each.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] for a room target that doesn't exist.
    /// Broadcasting to an empty server is quietly a no-op.
    ///
    /// [`RoomError::NotFound`]: wireroom_room::RoomError::NotFound
    pub async fn broadcast(
        &self,
        target: BroadcastTarget,
        id: &str,
        data: impl Into<Payload>,
    ) -> Result<(), WireroomError> {
        let envelope = Envelope::application(id, data.into())?;
        match target {
            BroadcastTarget::All => self.broadcast_all(&envelope).await,
            BroadcastTarget::Room(room_id) => {
                let registry = self.inner.registry.lock().await;
                let rooms = self.inner.rooms.lock().await;
                let room = rooms.get(room_id)?;
                room.send(&registry, &self.inner.codec, &envelope).await?;
                Ok(())
            }
        }
    }

    /// Everyone-path: one publish over [`ALL_TOPIC`] plus a direct send
    /// to the publishing representative, or plain iteration when the
    /// transport has no native pub/sub.
    async fn broadcast_all(
        &self,
        envelope: &Envelope,
    ) -> Result<(), WireroomError> {
        let handles = self.inner.registry.lock().await.all();
        let Some(representative) = handles.first() else {
            tracing::debug!("broadcast on empty server, nothing to do");
            return Ok(());
        };

        let frame = self.inner.codec.encode(envelope)?;
        let native = match representative
            .connection()
            .publish(ALL_TOPIC, frame.as_bytes())
            .await
        {
            Ok(native) => native,
            Err(e) => {
                tracing::debug!(error = %e, "broadcast publish failed");
                false
            }
        };

        if native {
            representative
                .send_envelope(&self.inner.codec, envelope)
                .await?;
        } else {
            for handle in &handles {
                handle.send_envelope(&self.inner.codec, envelope).await?;
            }
        }
        Ok(())
    }

    // --- Rooms ---------------------------------------------------------

    /// Creates a room over the given clients and subscribes their
    /// connections to the room topic.
    ///
    /// IDs that no longer resolve are dropped up front, so a room never
    /// starts with phantom members.
    ///
    /// # Errors
    /// [`RoomError::NoMembers`] when no ID survives resolution.
    ///
    /// [`RoomError::NoMembers`]: wireroom_room::RoomError::NoMembers
    pub async fn create_room(
        &self,
        members: &[ClientId],
    ) -> Result<RoomId, WireroomError> {
        let registry = self.inner.registry.lock().await;
        let mut rooms = self.inner.rooms.lock().await;

        let mut resolved = Vec::with_capacity(members.len());
        let mut handles = Vec::with_capacity(members.len());
        for id in members {
            match registry.lookup(*id) {
                Ok(handle) => {
                    resolved.push(*id);
                    handles.push(handle);
                }
                Err(_) => {
                    tracing::debug!(client_id = %id, "dropping unresolvable room member");
                }
            }
        }

        let room_id = rooms.create(resolved)?;
        let topic = room_id.to_string();
        for handle in &handles {
            if let Err(e) = handle.connection().subscribe(&topic).await {
                tracing::debug!(
                    client_id = %handle.id(),
                    error = %e,
                    "room topic subscribe failed"
                );
            }
        }
        tracing::info!(room_id = %room_id, members = handles.len(), "room created");
        Ok(room_id)
    }

    /// Deletes a room, unsubscribing its members from the room topic.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] for an unknown room.
    ///
    /// [`RoomError::NotFound`]: wireroom_room::RoomError::NotFound
    pub async fn delete_room(
        &self,
        room_id: RoomId,
    ) -> Result<(), WireroomError> {
        let registry = self.inner.registry.lock().await;
        let mut rooms = self.inner.rooms.lock().await;

        let room = rooms.delete(room_id)?;
        let topic = room.topic();
        for member in room.members() {
            if let Ok(handle) = registry.lookup(*member) {
                let _ = handle.connection().unsubscribe(&topic).await;
            }
        }
        tracing::info!(room_id = %room_id, "room deleted");
        Ok(())
    }

    /// Adds a client to an existing room. Idempotent for members.
    ///
    /// # Errors
    /// [`RegistryError::UnknownClient`] or [`RoomError::NotFound`].
    ///
    /// [`RegistryError::UnknownClient`]: wireroom_registry::RegistryError::UnknownClient
    /// [`RoomError::NotFound`]: wireroom_room::RoomError::NotFound
    pub async fn add_to_room(
        &self,
        room_id: RoomId,
        client: ClientId,
    ) -> Result<(), WireroomError> {
        let registry = self.inner.registry.lock().await;
        let mut rooms = self.inner.rooms.lock().await;

        let handle = registry.lookup(client)?;
        let room = rooms.get_mut(room_id)?;
        room.add_member(client);
        if let Err(e) = handle.connection().subscribe(&room.topic()).await {
            tracing::debug!(client_id = %client, error = %e, "room topic subscribe failed");
        }
        Ok(())
    }

    /// Removes a client from a room. A room this empties is deleted.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] for an unknown room.
    ///
    /// [`RoomError::NotFound`]: wireroom_room::RoomError::NotFound
    pub async fn remove_from_room(
        &self,
        room_id: RoomId,
        client: ClientId,
    ) -> Result<(), WireroomError> {
        let registry = self.inner.registry.lock().await;
        let mut rooms = self.inner.rooms.lock().await;

        let room = rooms.get_mut(room_id)?;
        let emptied = room.remove_member(client);
        if let Ok(handle) = registry.lookup(client) {
            let _ = handle.connection().unsubscribe(&room.topic()).await;
        }
        if emptied {
            rooms.delete(room_id)?;
            tracing::info!(room_id = %room_id, "room emptied and deleted");
        }
        Ok(())
    }

    // --- Introspection -------------------------------------------------

    /// Number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.inner.registry.lock().await.len()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.rooms.lock().await.len()
    }

    // --- Event bridge --------------------------------------------------
    //
    // The per-connection handler drives these for the built-in accept
    // loop; embedders with their own transport call them directly.

    /// Registers a connection, subscribes it to [`ALL_TOPIC`], and fires
    /// the connected hook — but only when the client is new. Calling
    /// this again for a registered ID returns the existing handle and
    /// fires nothing.
    pub async fn client_connected(
        &self,
        conn: Arc<C>,
        id: Option<ClientId>,
        data: D,
    ) -> ClientHandle<C, D> {
        let (handle, is_new) = {
            let mut registry = self.inner.registry.lock().await;
            let known =
                id.is_some_and(|id| registry.lookup(id).is_ok());
            (registry.get_or_create(id, conn, data), !known)
        };

        if is_new {
            if let Err(e) =
                handle.connection().subscribe(ALL_TOPIC).await
            {
                tracing::debug!(
                    client_id = %handle.id(),
                    error = %e,
                    "all-topic subscribe failed"
                );
            }
            tracing::info!(client_id = %handle.id(), "client connected");
            let hook = self
                .inner
                .connected
                .lock()
                .expect("hook lock poisoned")
                .clone();
            if let Some(hook) = hook {
                hook(handle.clone()).await;
            }
        }
        handle
    }

    /// Processes one inbound wire frame from a client.
    ///
    /// The sender is registered lazily through the same entry point as
    /// [`client_connected`](Self::client_connected), so a frame from an
    /// unseen ID creates the client rather than erroring. Malformed
    /// frames get an `ERROR` envelope reply and are not dispatched;
    /// inbound `ERROR` envelopes are logged and dispatched like any
    /// other message.
    pub async fn client_message(
        &self,
        conn: Arc<C>,
        id: ClientId,
        frame: &[u8],
    ) where
        D: Default,
    {
        let handle = self
            .client_connected(conn, Some(id), D::default())
            .await;

        let envelope = std::str::from_utf8(frame)
            .ok()
            .and_then(|text| self.inner.codec.decode(text));
        let Some(envelope) = envelope else {
            tracing::debug!(client_id = %id, "unrecognized frame, replying with error");
            let reply = Envelope::error("Unrecognized message format.");
            if let Err(e) =
                handle.send_envelope(&self.inner.codec, &reply).await
            {
                tracing::debug!(client_id = %id, error = %e, "error reply failed");
            }
            return;
        };

        match envelope {
            Envelope::ProtocolError { detail } => {
                tracing::error!(
                    client_id = %id,
                    ?detail,
                    "client reported a protocol error"
                );
                self.dispatch(ERROR_ID, handle, detail).await;
            }
            Envelope::Application { id: msg_id, data } => {
                self.dispatch(&msg_id, handle, data).await;
            }
        }
    }

    /// Removes a client and fires the disconnected hook with the removed
    /// handle. Rooms the client was in lose the membership; rooms this
    /// empties are deleted.
    pub async fn client_disconnected(&self, id: ClientId) {
        let removed = {
            let mut registry = self.inner.registry.lock().await;
            let mut rooms = self.inner.rooms.lock().await;
            rooms.evict_client(id);
            registry.remove(id)
        };

        if removed.is_some() {
            tracing::info!(client_id = %id, "client disconnected");
        }
        let hook = self
            .inner
            .disconnected
            .lock()
            .expect("hook lock poisoned")
            .clone();
        if let Some(hook) = hook {
            hook(id, removed).await;
        }
    }

    async fn dispatch(
        &self,
        msg_id: &str,
        handle: ClientHandle<C, D>,
        data: Payload,
    ) {
        let listeners = self.inner.router.lock().await.snapshot(msg_id);
        if listeners.is_empty() {
            tracing::trace!(message_id = msg_id, "no listeners registered");
            return;
        }
        for listener in listeners {
            listener((handle.clone(), data.clone())).await;
        }
    }
}

// =========================================================================
// RelayServer: the WebSocket front end
// =========================================================================

/// Builder for a WebSocket relay server.
pub struct RelayServerBuilder {
    bind_addr: String,
}

impl RelayServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }

    /// Sets the address to bind to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the transport and builds the server.
    pub async fn build<D>(self) -> Result<RelayServer<D>, WireroomError>
    where
        D: Clone + Default + Send + Sync + 'static,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(RelayServer {
            transport,
            handle: ServerHandle::new(),
        })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay server over the WebSocket transport.
///
/// `D` is the per-client attachment; the accept loop registers every
/// client with `D::default()`.
pub struct RelayServer<D> {
    transport: WebSocketTransport,
    handle: ServerHandle<WebSocketConnection, D>,
}

impl<D> RelayServer<D>
where
    D: Clone + Default + Send + Sync + 'static,
{
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle for registering listeners and sending, sharable across
    /// tasks and valid before and during [`run`](Self::run).
    pub fn handle(&self) -> ServerHandle<WebSocketConnection, D> {
        self.handle.clone()
    }

    /// Runs the accept loop, spawning one handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), WireroomError> {
        tracing::info!("relay server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let handle = self.handle.clone();
                    tokio::spawn(async move {
                        handle_connection(conn, handle).await;
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
