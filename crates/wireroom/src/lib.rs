//! # Wireroom
//!
//! A typed, bidirectional message-passing layer over WebSockets.
//!
//! Applications exchange `(id, data)` messages — a string message-type
//! ID plus a JSON payload — and register per-ID listeners on both ends.
//! The server groups clients into rooms and broadcasts to a room or to
//! everyone with exactly-once delivery per recipient.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wireroom::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WireroomError> {
//!     let server = RelayServer::<()>::builder()
//!         .bind("127.0.0.1:9000")
//!         .build::<()>()
//!         .await?;
//!
//!     let handle = server.handle();
//!     let relay = handle.clone();
//!     handle
//!         .on("CHAT", listener(move |(_client, data)| {
//!             let relay = relay.clone();
//!             async move {
//!                 let _ = relay
//!                     .broadcast(BroadcastTarget::All, "CHAT", data)
//!                     .await;
//!             }
//!         }))
//!         .await;
//!
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::WireroomError;
pub use server::{
    BroadcastTarget, ConnectedHook, DisconnectedHook, RelayServer,
    RelayServerBuilder, ServerHandle, ServerListener, ALL_TOPIC,
};

pub use wireroom_protocol::{
    Base64Codec, ClientId, Codec, Envelope, Payload, ProtocolError, RoomId,
    ERROR_ID,
};
pub use wireroom_registry::{ClientHandle, Registry, RegistryError};
pub use wireroom_room::{Room, RoomError, RoomTable};
pub use wireroom_router::{listener, Listener, Router};
pub use wireroom_transport::{
    Connection, ConnectionId, Transport, TransportError, WebSocketConnection,
};

/// One-stop imports for server applications.
pub mod prelude {
    pub use crate::{
        listener, BroadcastTarget, ClientId, Payload, RelayServer, RoomId,
        ServerHandle, WireroomError,
    };
}
