//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each accepted stream is split into independent read and write halves:
//! `recv` is called by the connection's own handler task, while `send` and
//! `publish` may be called concurrently from any task doing a broadcast.
//! Holding one lock for both directions would stall every outbound send
//! behind a blocked read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, TopicBroker, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;
type WsWriter = Mutex<SplitSink<WsStream, Message>>;
type WsReader = Mutex<SplitStream<WsStream>>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// Carries the shared [`TopicBroker`] that gives its connections native
/// publish/subscribe, so room and whole-server broadcasts cost one publish
/// instead of N sends.
pub struct WebSocketTransport {
    listener: TcpListener,
    broker: Arc<TopicBroker<WsWriter>>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            broker: Arc::new(TopicBroker::new()),
        })
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (writer, reader) = ws.split();
        Ok(WebSocketConnection {
            id,
            writer: Arc::new(Mutex::new(writer)),
            reader: Mutex::new(reader),
            broker: Arc::clone(&self.broker),
        })
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A single server-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    writer: Arc<WsWriter>,
    reader: WsReader,
    broker: Arc<TopicBroker<WsWriter>>,
}

async fn write_frame(
    writer: &WsWriter,
    data: &[u8],
) -> Result<(), TransportError> {
    let msg = Message::Binary(data.to_vec().into());
    writer.lock().await.send(msg).await.map_err(|e| {
        TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            e,
        ))
    })
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        write_frame(&self.writer, data).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.broker.subscribe(topic, self.id, &self.writer);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.broker.unsubscribe(topic, self.id);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
    ) -> Result<bool, TransportError> {
        let subscribers = self.broker.subscribers_except(topic, self.id);
        for writer in subscribers {
            // A subscriber that died mid-publish is not this caller's
            // problem; its own handler observes the failure.
            if let Err(e) = write_frame(&writer, data).await {
                tracing::debug!(%topic, error = %e, "publish skipped dead subscriber");
            }
        }
        Ok(true)
    }
}
