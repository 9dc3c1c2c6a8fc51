//! A minimal chat relay.
//!
//! Clients send `NICK` to pick a display name and `CHAT` to talk;
//! every chat line is broadcast to all connected clients as
//! `{"from": <nick>, "text": <line>}`.
//!
//! Run with `cargo run -p chat-relay`, then point any Wireroom client
//! at `ws://127.0.0.1:9000`.

use std::sync::{Arc, Mutex};

use wireroom::prelude::*;
use wireroom::{ClientHandle, WebSocketConnection};

/// Per-client attachment: the chosen display name, if any.
type Profile = Arc<Mutex<Option<String>>>;

#[tokio::main]
async fn main() -> Result<(), WireroomError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let server = RelayServer::<Profile>::builder()
        .bind("127.0.0.1:9000")
        .build::<Profile>()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "chat relay listening");

    let handle = server.handle();

    handle
        .on(
            "NICK",
            listener(
                |(client, data): (
                    ClientHandle<WebSocketConnection, Profile>,
                    Payload,
                )| async move {
                let Some(nick) = data.as_str() else {
                    tracing::warn!(client_id = %client.id(), "NICK without a name");
                    return;
                };
                *client.data().lock().unwrap() = Some(nick.to_string());
                tracing::info!(client_id = %client.id(), nick, "nick set");
            }),
        )
        .await;

    let relay = handle.clone();
    handle
        .on(
            "CHAT",
            listener(move |(client, data): (
                ClientHandle<WebSocketConnection, Profile>,
                Payload,
            )| {
                let relay = relay.clone();
                async move {
                    let Some(text) = data.as_str() else {
                        return;
                    };
                    let from = client
                        .data()
                        .lock()
                        .unwrap()
                        .clone()
                        .unwrap_or_else(|| client.id().to_string());
                    let line = serde_json::json!({
                        "from": from,
                        "text": text,
                    });
                    if let Err(e) = relay
                        .broadcast(BroadcastTarget::All, "CHAT", line)
                        .await
                    {
                        tracing::error!(error = %e, "chat broadcast failed");
                    }
                }
            }),
        )
        .await;

    server.run().await
}
