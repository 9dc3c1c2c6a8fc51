//! Per-client handle: identity, connection, and attached state.

use std::sync::Arc;

use wireroom_protocol::{ClientId, Codec, Envelope, Payload, ProtocolError};
use wireroom_transport::Connection;

/// A registered client: its ID, its connection, and whatever state the
/// application attached to it.
///
/// Handles are cheap to clone — the connection is behind an `Arc`, and
/// the attachment type `D` supplies its own `Clone`. Handler callbacks
/// receive clones, so a handler can hold one across an await without
/// pinning any registry lock.
pub struct ClientHandle<C, D> {
    id: ClientId,
    conn: Arc<C>,
    data: D,
}

// Manual impl: `#[derive(Clone)]` would also require `C: Clone`, but the
// connection is never cloned, only its Arc.
impl<C, D: Clone> Clone for ClientHandle<C, D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            conn: Arc::clone(&self.conn),
            data: self.data.clone(),
        }
    }
}

impl<C: Connection, D> ClientHandle<C, D> {
    pub fn new(id: ClientId, conn: Arc<C>, data: D) -> Self {
        Self { id, conn, data }
    }

    /// The client's stable identity.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// The underlying transport connection.
    pub fn connection(&self) -> &Arc<C> {
        &self.conn
    }

    /// The application-attached state.
    pub fn data(&self) -> &D {
        &self.data
    }

    /// Encodes an application message and sends it to this client.
    ///
    /// Encode failures are the caller's bug and propagate. Transport
    /// failures are not: a peer that vanished mid-send is normal churn,
    /// so the failure is logged and the call still succeeds. The
    /// connection's own read loop observes the disconnect and tears the
    /// client down through the usual path.
    pub async fn send(
        &self,
        codec: &dyn Codec,
        id: &str,
        data: Payload,
    ) -> Result<(), ProtocolError> {
        let envelope = Envelope::application(id, data)?;
        self.send_envelope(codec, &envelope).await
    }

    /// Sends an already-built envelope. Same failure contract as
    /// [`send`](Self::send).
    pub async fn send_envelope(
        &self,
        codec: &dyn Codec,
        envelope: &Envelope,
    ) -> Result<(), ProtocolError> {
        let frame = codec.encode(envelope)?;
        if let Err(e) = self.conn.send(frame.as_bytes()).await {
            tracing::debug!(
                client_id = %self.id,
                error = %e,
                "send to client failed, connection presumed gone"
            );
        }
        Ok(())
    }
}
