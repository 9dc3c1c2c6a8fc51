//! Per-connection handler: one task per accepted connection.

use std::sync::Arc;

use wireroom_protocol::Codec;
use wireroom_transport::Connection;

use crate::server::ServerHandle;

/// Drives a single connection from accept to close.
///
/// Registers the client, then feeds every received frame through the
/// server's message path until the peer closes or the transport fails.
/// Teardown runs on every exit path, so the disconnected hook fires
/// exactly once per connection.
pub(crate) async fn handle_connection<C, D, K>(
    conn: C,
    handle: ServerHandle<C, D, K>,
) where
    C: Connection,
    D: Clone + Default + Send + Sync + 'static,
    K: Codec,
{
    let conn = Arc::new(conn);
    let client = handle
        .client_connected(Arc::clone(&conn), None, D::default())
        .await;
    let client_id = client.id();

    loop {
        match conn.recv().await {
            Ok(Some(frame)) => {
                handle
                    .client_message(Arc::clone(&conn), client_id, &frame)
                    .await;
            }
            Ok(None) => {
                tracing::debug!(%client_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "recv error");
                break;
            }
        }
    }

    handle.client_disconnected(client_id).await;
}
