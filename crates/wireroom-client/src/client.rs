//! The peer client: one WebSocket connection plus listener routing.

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use wireroom_protocol::{Base64Codec, Codec, Envelope, Payload, ERROR_ID};
use wireroom_router::{Listener, Router};

use crate::ClientError;

type PeerStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type PeerWriter = Arc<Mutex<SplitSink<PeerStream, Message>>>;

/// Fired once the connection is established.
pub type OpenHook =
    Arc<dyn Fn() -> futures_util::future::BoxFuture<'static, ()> + Send + Sync>;
/// Fired when the connection ends, with the peer's close code and reason
/// when it sent one.
pub type CloseHook = Arc<
    dyn Fn(Option<u16>, String) -> futures_util::future::BoxFuture<'static, ()>
        + Send
        + Sync,
>;
/// Fired on a transport-level read failure.
pub type ErrorHook = Arc<
    dyn Fn(String) -> futures_util::future::BoxFuture<'static, ()>
        + Send
        + Sync,
>;

/// Lifecycle callbacks for a [`Client`]. All optional.
#[derive(Default, Clone)]
pub struct ClientEvents {
    pub open: Option<OpenHook>,
    pub close: Option<CloseHook>,
    pub error: Option<ErrorHook>,
}

impl ClientEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.open = Some(Arc::new(move || f().boxed()));
        self
    }

    pub fn on_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Option<u16>, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.close = Some(Arc::new(move |code, reason| f(code, reason).boxed()));
        self
    }

    pub fn on_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.error = Some(Arc::new(move |msg| f(msg).boxed()));
        self
    }
}

/// A connected peer: typed sends out, listener dispatch in.
///
/// Cloning shares the connection and listener table, so one task can
/// register listeners while another sends.
#[derive(Clone)]
pub struct Client {
    writer: PeerWriter,
    router: Arc<Mutex<Router<Payload>>>,
}

impl Client {
    /// Connects to a relay server at `url` (a `ws://` address), fires
    /// the `open` callback, and spawns the reader task that keeps
    /// dispatching incoming messages until the connection ends.
    pub async fn connect(
        url: &str,
        events: ClientEvents,
    ) -> Result<Self, ClientError> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(ClientError::Connect)?;
        tracing::debug!(url, "connected to relay server");

        let (writer, reader) = ws.split();
        let client = Self {
            writer: Arc::new(Mutex::new(writer)),
            router: Arc::new(Mutex::new(Router::new())),
        };

        if let Some(open) = &events.open {
            open().await;
        }

        let reader_client = client.clone();
        tokio::spawn(async move {
            reader_client.read_loop(reader, events).await;
        });

        Ok(client)
    }

    /// Encodes and sends an application message.
    pub async fn send(
        &self,
        id: &str,
        data: Payload,
    ) -> Result<(), ClientError> {
        let envelope = Envelope::application(id, data)?;
        self.send_envelope(&envelope).await
    }

    /// Registers a listener for a message-type ID.
    pub async fn on(&self, id: &str, listener: Listener<Payload>) {
        self.router.lock().await.on(id, listener);
    }

    /// Removes a previously registered listener.
    pub async fn off(&self, id: &str, listener: &Listener<Payload>) {
        self.router.lock().await.off(id, listener);
    }

    /// Closes the connection. The server observing the close tears down
    /// its side; the reader task ends and fires the `close` callback.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(ClientError::Send)
    }

    async fn send_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<(), ClientError> {
        let frame = Base64Codec.encode(envelope)?;
        self.writer
            .lock()
            .await
            .send(Message::Text(frame.into()))
            .await
            .map_err(ClientError::Send)
    }

    async fn read_loop(
        &self,
        mut reader: SplitStream<PeerStream>,
        events: ClientEvents,
    ) {
        let mut close_info: Option<(Option<u16>, String)> = None;
        while let Some(item) = reader.next().await {
            match item {
                Ok(Message::Text(text)) => {
                    self.handle_frame(text.as_str()).await;
                }
                Ok(Message::Binary(data)) => match std::str::from_utf8(&data)
                {
                    Ok(text) => self.handle_frame(text).await,
                    Err(_) => self.reject_frame().await,
                },
                Ok(Message::Close(frame)) => {
                    close_info = Some(match frame {
                        Some(f) => {
                            (Some(u16::from(f.code)), f.reason.to_string())
                        }
                        None => (None, String::new()),
                    });
                    break;
                }
                Ok(_) => continue, // ping/pong
                Err(e) => {
                    tracing::debug!(error = %e, "connection read failed");
                    if let Some(error) = &events.error {
                        error(e.to_string()).await;
                    }
                    break;
                }
            }
        }
        let (code, reason) = close_info.unwrap_or((None, String::new()));
        if let Some(close) = &events.close {
            close(code, reason).await;
        }
    }

    async fn handle_frame(&self, text: &str) {
        match Base64Codec.decode(text) {
            Some(Envelope::Application { id, data }) => {
                self.dispatch(&id, data).await;
            }
            Some(Envelope::ProtocolError { detail }) => {
                tracing::error!(?detail, "server reported a protocol error");
                self.dispatch(ERROR_ID, detail).await;
            }
            None => self.reject_frame().await,
        }
    }

    /// A frame that didn't decode: tell the server, and let local
    /// `"ERROR"` listeners know too.
    async fn reject_frame(&self) {
        let detail = Payload::from("Unrecognized message format.");
        let reply = Envelope::error("Unrecognized message format.");
        if let Err(e) = self.send_envelope(&reply).await {
            tracing::debug!(error = %e, "could not report malformed frame");
        }
        self.dispatch(ERROR_ID, detail).await;
    }

    async fn dispatch(&self, id: &str, data: Payload) {
        let listeners = self.router.lock().await.snapshot(id);
        for listener in listeners {
            listener(data.clone()).await;
        }
    }
}
