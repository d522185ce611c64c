// WebSocket transport for the note stream

use crate::auth::interceptor::CallContext;
use crate::auth::stream::{MessageStream, ServerStream};
use crate::core::errors::KeeperError;
use crate::core::models::{NoteAddRequest, StreamReply};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use tracing::{debug, warn};

/// Upgraded socket speaking JSON note frames
///
/// The call's cancellation token fires once the peer closes or the socket
/// breaks, so work still running for the stream stops with it.
pub struct WsStream {
    socket: WebSocket,
    context: CallContext,
}

impl WsStream {
    pub fn new(socket: WebSocket, context: CallContext) -> Self {
        Self { socket, context }
    }
}

#[async_trait]
impl MessageStream for WsStream {
    type Inbound = NoteAddRequest;
    type Outbound = StreamReply;

    async fn recv(&mut self) -> Option<Result<NoteAddRequest, KeeperError>> {
        loop {
            let Some(received) = self.socket.recv().await else {
                self.context.cancellation().cancel();
                return None;
            };
            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "WebSocket receive failed");
                    self.context.cancellation().cancel();
                    return None;
                }
            };

            let parsed = match message {
                Message::Text(text) => serde_json::from_str::<NoteAddRequest>(&text),
                Message::Binary(bytes) => serde_json::from_slice::<NoteAddRequest>(&bytes),
                Message::Close(_) => {
                    debug!("WebSocket closed by peer");
                    self.context.cancellation().cancel();
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            return Some(
                parsed.map_err(|e| KeeperError::Validation(format!("invalid note frame: {}", e))),
            );
        }
    }

    async fn send(&mut self, message: StreamReply) -> Result<(), KeeperError> {
        let text = serde_json::to_string(&message)
            .map_err(|e| KeeperError::Internal(format!("reply encoding failed: {}", e)))?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| KeeperError::Internal(format!("websocket send failed: {}", e)))
    }
}

impl ServerStream for WsStream {
    fn context(&self) -> &CallContext {
        &self.context
    }
}
