//! Per-connection handler: decode inbound events, forward them to the
//! core, and write whatever the core delivers back to the socket.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound sink with the core
//!   2. Loop: inbound frames → core commands, sink events → outbound frames
//!   3. On exit (clean close, error, or panic) → the core is told the
//!      connection is gone

use std::sync::Arc;

use nightowl_protocol::{ClientEvent, Codec};
use nightowl_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::NightowlError;
use crate::dispatcher::CoreHandle;

/// Drop guard that reports the disconnect when the handler exits.
///
/// `Drop` is synchronous, so the command is sent from a spawned task.
struct DisconnectGuard {
    conn: ConnectionId,
    core: CoreHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn = self.conn;
        let core = self.core.clone();
        tokio::spawn(async move {
            let _ = core.disconnect(conn).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    core: CoreHandle,
    codec: Arc<C>,
) -> Result<(), NightowlError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (sink, mut outbound) = mpsc::unbounded_channel();
    core.connect(conn_id, sink).await?;
    let _guard = DisconnectGuard {
        conn: conn_id,
        core: core.clone(),
    };

    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(data)) => dispatch_frame(conn_id, &data, &core, codec.as_ref()).await?,
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            event = outbound.recv() => {
                // The core dropped our sink: it has shut down.
                let Some(event) = event else {
                    if let Err(e) = conn.close().await {
                        tracing::debug!(%conn_id, error = %e, "close failed");
                    }
                    break;
                };
                let bytes = codec.encode(&event)?;
                conn.send(&bytes).await?;
            }
        }
    }

    // _guard drops here → disconnect is reported.
    Ok(())
}

/// Decodes one inbound frame and forwards it to the core.
///
/// Frames that do not decode to a known event are ignored.
async fn dispatch_frame<C: Codec>(
    conn_id: ConnectionId,
    data: &[u8],
    core: &CoreHandle,
    codec: &C,
) -> Result<(), NightowlError> {
    let event: ClientEvent = match codec.decode(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "ignoring undecodable frame");
            return Ok(());
        }
    };

    match event {
        ClientEvent::Join { display_name } => core.join(conn_id, display_name).await,
        ClientEvent::SendMessage { match_id, body } => {
            core.send_message(conn_id, match_id, body).await
        }
    }
}
