// Streaming call abstraction and its authenticated decorator

use crate::auth::interceptor::{AuthenticatedContext, CallContext};
use crate::core::errors::KeeperError;
use crate::core::models::Principal;
use async_trait::async_trait;

/// Bidirectional message stream, independent of transport
#[async_trait]
pub trait MessageStream: Send {
    type Inbound: Send;
    type Outbound: Send;

    /// Next inbound message; `None` once the peer has closed
    async fn recv(&mut self) -> Option<Result<Self::Inbound, KeeperError>>;

    async fn send(&mut self, message: Self::Outbound) -> Result<(), KeeperError>;
}

/// Stream as the transport opens it, carrying the original call context
pub trait ServerStream: MessageStream {
    fn context(&self) -> &CallContext;
}

/// Decorates a server stream with the principal-bearing context
///
/// The wrapped stream keeps its `recv`/`send` contract; only the context a
/// handler observes changes, and it stays fixed for the stream's lifetime.
pub struct AuthenticatedStream<S> {
    inner: S,
    context: AuthenticatedContext,
}

impl<S> AuthenticatedStream<S> {
    pub fn new(inner: S, context: AuthenticatedContext) -> Self {
        Self { inner, context }
    }

    pub fn context(&self) -> &AuthenticatedContext {
        &self.context
    }

    pub fn principal(&self) -> &Principal {
        self.context.principal()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S> MessageStream for AuthenticatedStream<S>
where
    S: MessageStream,
{
    type Inbound = S::Inbound;
    type Outbound = S::Outbound;

    async fn recv(&mut self) -> Option<Result<Self::Inbound, KeeperError>> {
        let cancellation = self.context.call().cancellation().clone();
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Some(Err(KeeperError::Cancelled)),
            message = self.inner.recv() => message,
        }
    }

    async fn send(&mut self, message: Self::Outbound) -> Result<(), KeeperError> {
        self.context.ensure_active()?;
        self.inner.send(message).await
    }
}
