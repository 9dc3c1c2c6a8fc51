//! Tests for the event-bridge API over an in-memory connection type.
//!
//! No sockets here: a `MemoryConnection` records what the server sends
//! it, which makes the lazy-registration, error-reply, and fallback
//! broadcast paths easy to observe directly. Because the connection
//! leaves the pub/sub trait defaults in place, every broadcast in this
//! file exercises the iterate-and-send fallback.

use std::sync::{Arc, Mutex};

use wireroom::{
    listener, Base64Codec, BroadcastTarget, ClientHandle, ClientId, Codec,
    Envelope, Payload, ServerHandle, WireroomError, ERROR_ID,
};
use wireroom_transport::{Connection, ConnectionId, TransportError};

/// In-memory connection: sends are recorded, nothing is received.
struct MemoryConnection {
    id: ConnectionId,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl MemoryConnection {
    fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(id),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Decoded IDs of every envelope delivered to this connection.
    fn delivered_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|frame| {
                let text = std::str::from_utf8(frame).unwrap();
                Base64Codec.decode(text).unwrap().id().to_string()
            })
            .collect()
    }
}

impl Connection for MemoryConnection {
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

type Handle = ServerHandle<MemoryConnection, ()>;

fn frame(id: &str, data: Payload) -> Vec<u8> {
    let envelope = Envelope::application(id, data).unwrap();
    Base64Codec.encode(&envelope).unwrap().into_bytes()
}

#[tokio::test]
async fn test_client_connected_registers_and_fires_hook_once() {
    let handle = Handle::new();
    let fired = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&fired);
    handle.on_connected(Arc::new(move |_client| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            *counter.lock().unwrap() += 1;
        })
    }));

    let conn = MemoryConnection::new(1);
    let client = handle
        .client_connected(Arc::clone(&conn), None, ())
        .await;

    // Re-announcing the same client is a no-op for the hook.
    let again = handle
        .client_connected(conn, Some(client.id()), ())
        .await;

    assert_eq!(client.id(), again.id());
    assert_eq!(handle.client_count().await, 1);
    assert_eq!(*fired.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_client_message_dispatches_with_sender_handle() {
    let handle = Handle::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    handle
        .on(
            "MOVE",
            listener(move |(client, data): (
                ClientHandle<MemoryConnection, ()>,
                Payload,
            )| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push((client.id(), data));
                }
            }),
        )
        .await;

    let conn = MemoryConnection::new(1);
    let client = handle
        .client_connected(Arc::clone(&conn), None, ())
        .await;

    handle
        .client_message(
            conn,
            client.id(),
            &frame("MOVE", Payload::from(serde_json::json!([1, 2]))),
        )
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, client.id());
    assert_eq!(
        seen[0].1.as_value().unwrap(),
        &serde_json::json!([1, 2])
    );
}

#[tokio::test]
async fn test_client_message_from_unseen_id_registers_lazily() {
    let handle = Handle::new();
    let conn = MemoryConnection::new(1);
    let id = ClientId::random();

    handle
        .client_message(conn, id, &frame("HELLO", Payload::Undefined))
        .await;

    assert_eq!(handle.client_count().await, 1);
    // The lazily created client is fully addressable.
    handle.send(id, "WELCOME", Payload::Undefined).await.unwrap();
}

#[tokio::test]
async fn test_malformed_frame_replies_error_without_dispatch() {
    let handle = Handle::new();
    let dispatched = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&dispatched);
    handle
        .on(
            "ANY",
            listener(move |(_, _): (_, Payload)| {
                let flag = Arc::clone(&flag);
                async move {
                    *flag.lock().unwrap() = true;
                }
            }),
        )
        .await;

    let conn = MemoryConnection::new(1);
    let client = handle
        .client_connected(Arc::clone(&conn), None, ())
        .await;

    handle
        .client_message(Arc::clone(&conn), client.id(), b"\x00\xffgarbage")
        .await;

    assert_eq!(conn.delivered_ids(), vec![ERROR_ID]);
    assert!(!*dispatched.lock().unwrap());
}

#[tokio::test]
async fn test_broadcast_all_fallback_delivers_once_per_client() {
    let handle = Handle::new();
    let conns: Vec<_> = (1..=3).map(MemoryConnection::new).collect();
    for conn in &conns {
        handle
            .client_connected(Arc::clone(conn), None, ())
            .await;
    }

    handle
        .broadcast(BroadcastTarget::All, "NEWS", Payload::from("flash"))
        .await
        .unwrap();

    for conn in &conns {
        assert_eq!(conn.delivered_ids(), vec!["NEWS"]);
    }
}

#[tokio::test]
async fn test_broadcast_all_on_empty_server_is_quiet() {
    let handle = Handle::new();

    handle
        .broadcast(BroadcastTarget::All, "NEWS", Payload::Undefined)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_room_drops_unresolvable_members() {
    let handle = Handle::new();
    let conn = MemoryConnection::new(1);
    let real = handle
        .client_connected(conn, None, ())
        .await
        .id();
    let ghost = ClientId::random();

    let room = handle.create_room(&[ghost, real]).await.unwrap();

    handle
        .broadcast(
            BroadcastTarget::Room(room),
            "EVENT",
            Payload::Undefined,
        )
        .await
        .unwrap();
    assert_eq!(handle.room_count().await, 1);
}

#[tokio::test]
async fn test_create_room_with_no_survivors_fails() {
    let handle = Handle::new();

    let result = handle
        .create_room(&[ClientId::random(), ClientId::random()])
        .await;

    assert!(matches!(result, Err(WireroomError::Room(_))));
    assert_eq!(handle.room_count().await, 0);
}

#[tokio::test]
async fn test_remove_from_room_deletes_emptied_room() {
    let handle = Handle::new();
    let a = handle
        .client_connected(MemoryConnection::new(1), None, ())
        .await
        .id();
    let b = handle
        .client_connected(MemoryConnection::new(2), None, ())
        .await
        .id();
    let room = handle.create_room(&[a, b]).await.unwrap();

    handle.remove_from_room(room, a).await.unwrap();
    assert_eq!(handle.room_count().await, 1);

    handle.remove_from_room(room, b).await.unwrap();
    assert_eq!(handle.room_count().await, 0);
}

#[tokio::test]
async fn test_add_to_room_unknown_client_is_an_error() {
    let handle = Handle::new();
    let a = handle
        .client_connected(MemoryConnection::new(1), None, ())
        .await
        .id();
    let room = handle.create_room(&[a]).await.unwrap();

    let result = handle.add_to_room(room, ClientId::random()).await;

    assert!(matches!(result, Err(WireroomError::Registry(_))));
}

#[tokio::test]
async fn test_client_disconnected_fires_hook_with_snapshot() {
    let handle = Handle::new();
    let observed = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&observed);
    handle.on_disconnected(Arc::new(move |id, removed| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            *sink.lock().unwrap() = Some((id, removed.is_some()));
        })
    }));

    let client = handle
        .client_connected(MemoryConnection::new(1), None, ())
        .await;

    handle.client_disconnected(client.id()).await;

    assert_eq!(handle.client_count().await, 0);
    assert_eq!(
        *observed.lock().unwrap(),
        Some((client.id(), true))
    );
}

#[tokio::test]
async fn test_stale_room_member_is_skipped_on_broadcast() {
    let handle = Handle::new();
    let conn_a = MemoryConnection::new(1);
    let conn_b = MemoryConnection::new(2);
    let a = handle
        .client_connected(Arc::clone(&conn_a), None, ())
        .await
        .id();
    let b = handle
        .client_connected(Arc::clone(&conn_b), None, ())
        .await
        .id();
    let room = handle.create_room(&[a, b]).await.unwrap();

    handle.client_disconnected(b).await;

    handle
        .broadcast(
            BroadcastTarget::Room(room),
            "EVENT",
            Payload::from("still here"),
        )
        .await
        .unwrap();

    assert_eq!(conn_a.delivered_ids(), vec!["EVENT"]);
    assert!(conn_b.delivered_ids().is_empty());
}
