//! Server side of the heartbeat duplex stream.
//!
//! Per-stream state machine: `Open → Reading (loop) → Closed-Normal |
//! Closed-Error`. Every inbound message is re-validated; a malformed or
//! unknown-identity message is terminal for that stream, never
//! skip-and-continue. A clean end-of-stream closes the session without any
//! response. Errors terminate only the stream they occur on; other plugins'
//! streams are unaffected.

use crate::protocol::{HeartbeatClose, HeartbeatMessage};
use crate::registry::PluginRegistry;
use crate::rpc::LifecycleError;
use crate::transport::UnixTransport;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub(crate) type HeartbeatServerTransport = UnixTransport<HeartbeatMessage, HeartbeatClose>;

/// Serves one heartbeat stream until end-of-stream or a terminal error.
pub(crate) async fn serve_stream(
    mut transport: HeartbeatServerTransport,
    registry: Arc<Mutex<PluginRegistry>>,
) {
    loop {
        match transport.next().await {
            // Client closed the stream; no response is sent.
            None => {
                debug!("heartbeat stream ended");
                return;
            }
            Some(Err(e)) => {
                close_with(
                    &mut transport,
                    LifecycleError::Internal {
                        message: format!("receive failed: {}", e),
                    },
                )
                .await;
                return;
            }
            Some(Ok(msg)) => {
                if msg.cookie_key.is_empty() {
                    close_with(&mut transport, LifecycleError::EmptyCookieKey).await;
                    return;
                }

                let result = registry
                    .lock()
                    .await
                    .record_heartbeat(&msg.cookie_key, msg.timestamp);

                match result {
                    Ok(()) => {
                        debug!(
                            cookie_key = %msg.cookie_key,
                            memory_mb = msg.memory_usage / 1024.0 / 1024.0,
                            cpu_percent = msg.cpu_usage,
                            "heartbeat received"
                        );
                    }
                    Err(error) => {
                        close_with(&mut transport, error).await;
                        return;
                    }
                }
            }
        }
    }
}

async fn close_with(transport: &mut HeartbeatServerTransport, error: LifecycleError) {
    warn!(error = %error, "closing heartbeat stream");
    if let Err(e) = transport.send(HeartbeatClose::new(error)).await {
        debug!(error = %e, "heartbeat close response not delivered");
    }
}
