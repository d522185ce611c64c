// Request interceptor: the single authentication gate for inbound calls

use crate::auth::stream::{AuthenticatedStream, ServerStream};
use crate::auth::token::TokenVerifier;
use crate::core::errors::{KeeperError, TokenError};
use crate::core::models::Principal;
use axum::http::HeaderMap;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Call metadata key carrying the session token
pub const SESSION_TOKEN_KEY: &str = "session_token";

/// Every operation the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Health,
    Register,
    Login,
    CardAdd,
    CardList,
    CardDelete,
    NoteAdd,
    NoteList,
    NoteDelete,
    NoteStream,
    CredentialAdd,
    CredentialList,
    CredentialDelete,
}

impl Operation {
    /// Fully qualified operation name, as it appears in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Health => "keeper.Keeper/Health",
            Operation::Register => "keeper.Keeper/Register",
            Operation::Login => "keeper.Keeper/Login",
            Operation::CardAdd => "keeper.Keeper/CardAdd",
            Operation::CardList => "keeper.Keeper/CardList",
            Operation::CardDelete => "keeper.Keeper/CardDelete",
            Operation::NoteAdd => "keeper.Keeper/NoteAdd",
            Operation::NoteList => "keeper.Keeper/NoteList",
            Operation::NoteDelete => "keeper.Keeper/NoteDelete",
            Operation::NoteStream => "keeper.Keeper/NoteStream",
            Operation::CredentialAdd => "keeper.Keeper/CredentialAdd",
            Operation::CredentialList => "keeper.Keeper/CredentialList",
            Operation::CredentialDelete => "keeper.Keeper/CredentialDelete",
        }
    }
}

/// Operations reachable without a session token
pub const PUBLIC_OPERATIONS: &[Operation] =
    &[Operation::Health, Operation::Register, Operation::Login];

/// Closed set of operations that bypass verification, matched exactly
#[derive(Debug, Clone)]
pub struct Allowlist(HashSet<Operation>);

impl Allowlist {
    pub fn new(operations: impl IntoIterator<Item = Operation>) -> Self {
        Self(operations.into_iter().collect())
    }

    pub fn contains(&self, operation: Operation) -> bool {
        self.0.contains(&operation)
    }
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::new(PUBLIC_OPERATIONS.iter().copied())
    }
}

/// Multi-valued call metadata (headers, for the HTTP transport)
///
/// Keys are case-insensitive and stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct CallMetadata(HashMap<String, Vec<String>>);

impl CallMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Builder form of [`CallMetadata::append`]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// Collect every header as metadata; non-UTF-8 values are skipped
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut metadata = Self::new();
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                metadata.append(name.as_str(), value);
            }
        }
        metadata
    }
}

/// Per-call context as it arrives from the transport
#[derive(Debug, Clone)]
pub struct CallContext {
    operation: Operation,
    metadata: CallMetadata,
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new(operation: Operation, metadata: CallMetadata) -> Self {
        Self {
            operation,
            metadata,
            cancellation: CancellationToken::new(),
        }
    }

    /// Bind the call to a transport-owned cancellation token
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn metadata(&self) -> &CallMetadata {
        &self.metadata
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with `Cancelled` once the caller has gone away
    pub fn ensure_active(&self) -> Result<(), KeeperError> {
        if self.is_cancelled() {
            return Err(KeeperError::Cancelled);
        }
        Ok(())
    }
}

/// Call context augmented with the verified principal
///
/// Only [`RequestInterceptor`] constructs these.
#[derive(Debug, Clone)]
pub struct AuthenticatedContext {
    call: CallContext,
    principal: Principal,
}

impl AuthenticatedContext {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn call(&self) -> &CallContext {
        &self.call
    }

    pub fn operation(&self) -> Operation {
        self.call.operation()
    }

    pub fn ensure_active(&self) -> Result<(), KeeperError> {
        self.call.ensure_active()
    }
}

/// Outcome of passing the gate
#[derive(Debug, Clone)]
pub enum Admission {
    /// Allowlisted: the original context, unverified
    Public(CallContext),
    Authenticated(AuthenticatedContext),
}

impl Admission {
    pub fn call(&self) -> &CallContext {
        match self {
            Admission::Public(call) => call,
            Admission::Authenticated(ctx) => ctx.call(),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Admission::Public(_) => None,
            Admission::Authenticated(ctx) => Some(ctx.principal()),
        }
    }
}

/// Stream after the gate; public streams are forwarded unwrapped
pub enum GatedStream<S> {
    Public(S),
    Authenticated(AuthenticatedStream<S>),
}

impl<S> GatedStream<S> {
    /// The principal-bearing stream, for operations that must never run public
    pub fn into_authenticated(self) -> Result<AuthenticatedStream<S>, KeeperError> {
        match self {
            GatedStream::Authenticated(stream) => Ok(stream),
            GatedStream::Public(_) => Err(KeeperError::Unauthenticated(
                "stream requires a session token".to_string(),
            )),
        }
    }
}

/// Authentication gate shared by every transport
///
/// Allowlisted operations pass through untouched. Everything else must carry
/// exactly one `session_token` value that verifies, and the handler receives
/// a fresh [`AuthenticatedContext`] in place of the original call context.
pub struct RequestInterceptor {
    allowlist: Allowlist,
    verifier: Arc<TokenVerifier>,
}

impl RequestInterceptor {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self::with_allowlist(verifier, Allowlist::default())
    }

    pub fn with_allowlist(verifier: Arc<TokenVerifier>, allowlist: Allowlist) -> Self {
        Self { allowlist, verifier }
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    /// Run the gate for one call
    pub fn admit(&self, call: CallContext) -> Result<Admission, KeeperError> {
        call.ensure_active()?;

        if self.allowlist.contains(call.operation()) {
            return Ok(Admission::Public(call));
        }

        let token = Self::extract_token(call.metadata())?;
        let principal = self.verifier.verify(token)?;

        debug!(
            operation = call.operation().name(),
            user_id = %principal.user_id,
            token = principal.issued_via.short(),
            "Call authenticated"
        );

        Ok(Admission::Authenticated(AuthenticatedContext { call, principal }))
    }

    /// Gate a single-shot call, invoking `handler` only on admission
    pub async fn intercept<F, Fut, T>(&self, call: CallContext, handler: F) -> Result<T, KeeperError>
    where
        F: FnOnce(Admission) -> Fut,
        Fut: Future<Output = Result<T, KeeperError>>,
    {
        let admission = self.admit(call)?;
        handler(admission).await
    }

    /// Gate a stream once, at open
    ///
    /// On success every message exchanged through the returned stream sees
    /// the principal-bearing context.
    pub fn intercept_stream<S: ServerStream>(&self, stream: S) -> Result<GatedStream<S>, KeeperError> {
        match self.admit(stream.context().clone())? {
            Admission::Public(_) => Ok(GatedStream::Public(stream)),
            Admission::Authenticated(ctx) => {
                Ok(GatedStream::Authenticated(AuthenticatedStream::new(stream, ctx)))
            }
        }
    }

    fn extract_token(metadata: &CallMetadata) -> Result<&str, TokenError> {
        match metadata.get_all(SESSION_TOKEN_KEY) {
            [] => Err(TokenError::NotPresent),
            [token] => Ok(token.as_str()),
            values => Err(TokenError::Malformed(format!(
                "expected one {} value, got {}",
                SESSION_TOKEN_KEY,
                values.len()
            ))),
        }
    }
}
