// Note records, unary and streamed

use super::{decode_records, encode_metadata, require_text};
use crate::auth::interceptor::AuthenticatedContext;
use crate::auth::stream::{AuthenticatedStream, MessageStream};
use crate::core::errors::KeeperError;
use crate::core::models::{NoteAddRequest, NoteData, Record, StreamReply};
use crate::storage::SecretStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct NoteService {
    store: Arc<dyn SecretStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        ctx: &AuthenticatedContext,
        request: NoteAddRequest,
    ) -> Result<i64, KeeperError> {
        ctx.ensure_active()?;
        validate_note(&request.note)?;
        let metadata = encode_metadata(&request.metadata)?;

        ctx.ensure_active()?;
        let owner = ctx.principal().user_id;
        let id = self.store.note_add(owner, &request.note, metadata).await?;

        info!(user_id = %owner, note_id = id, "Note stored");
        Ok(id)
    }

    pub async fn list(&self, ctx: &AuthenticatedContext) -> Result<Vec<Record<NoteData>>, KeeperError> {
        ctx.ensure_active()?;
        let rows = self.store.note_list(ctx.principal().user_id).await?;
        decode_records(ctx, rows)
    }

    pub async fn delete(&self, ctx: &AuthenticatedContext, id: i64) -> Result<(), KeeperError> {
        ctx.ensure_active()?;
        let owner = ctx.principal().user_id;
        self.store.note_delete(owner, id).await?;

        info!(user_id = %owner, note_id = id, "Note deleted");
        Ok(())
    }

    /// Store every note the client sends, replying once per frame
    ///
    /// A bad frame gets an error reply and the stream continues. Returns the
    /// number of notes stored once the peer closes; fails with `Cancelled` if
    /// the call is abandoned first.
    pub async fn serve_stream<S>(&self, stream: &mut AuthenticatedStream<S>) -> Result<usize, KeeperError>
    where
        S: MessageStream<Inbound = NoteAddRequest, Outbound = StreamReply>,
    {
        let ctx = stream.context().clone();
        let mut stored = 0;

        while let Some(frame) = stream.recv().await {
            let reply = match frame {
                Ok(request) => match self.add(&ctx, request).await {
                    Ok(id) => {
                        stored += 1;
                        StreamReply::saved(id)
                    }
                    Err(KeeperError::Cancelled) => return Err(KeeperError::Cancelled),
                    Err(e) => {
                        debug!(user_id = %ctx.principal().user_id, error = %e, "Streamed note rejected");
                        StreamReply::failed(&e)
                    }
                },
                Err(KeeperError::Cancelled) => return Err(KeeperError::Cancelled),
                Err(e) => {
                    warn!(user_id = %ctx.principal().user_id, error = %e, "Unreadable stream frame");
                    StreamReply::failed(&e)
                }
            };
            stream.send(reply).await?;
        }

        info!(user_id = %ctx.principal().user_id, stored, "Note stream closed");
        Ok(stored)
    }
}

pub fn validate_note(note: &NoteData) -> Result<(), KeeperError> {
    require_text("note title", &note.title)?;
    require_text("note text", &note.text)
}
