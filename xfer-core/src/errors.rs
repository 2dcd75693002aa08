//! Error taxonomy for the transfer coordinator.
//!
//! Mirrors the Feathers-style `DogError`/`ErrorKind` split this workspace has used
//! elsewhere: a small closed set of kinds, each owning its HTTP status, plus a
//! message and an optional source error for the server-side log line.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// The eight error kinds the coordinator surface ever returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthenticated,
    PermissionDenied,
    BadRequest,
    Gone,
    FileTooLarge,
    BackendUnavailable,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::PermissionDenied => 401,
            ErrorKind::BadRequest => 400,
            ErrorKind::Gone => 410,
            ErrorKind::FileTooLarge => 400,
            ErrorKind::BackendUnavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unauthenticated => "Unauthenticated",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::Gone => "Gone",
            ErrorKind::FileTooLarge => "FileTooLarge",
            ErrorKind::BackendUnavailable => "BackendUnavailable",
            ErrorKind::Internal => "Internal",
        }
    }
}

/// A WWW-Authenticate challenge to attach to an `Unauthenticated` response.
#[derive(Debug, Clone, Serialize)]
pub struct Challenge {
    pub nonce_b64: String,
}

#[derive(Debug)]
pub struct XferError {
    pub kind: ErrorKind,
    pub message: String,
    pub challenge: Option<Challenge>,
    source: Option<anyhow::Error>,
}

impl fmt::Display for XferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)
    }
}

impl std::error::Error for XferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref())
    }
}

impl XferError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            challenge: None,
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// `Unauthenticated` always carries the fresh nonce the caller must challenge with next.
    pub fn unauthenticated_with_challenge(message: impl Into<String>, nonce_b64: String) -> Self {
        let mut e = Self::new(ErrorKind::Unauthenticated, message);
        e.challenge = Some(Challenge { nonce_b64 });
        e
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Gone, message)
    }

    pub fn file_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileTooLarge, message)
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// JSON body for the HTTP response: `{ "error": "..." }` per the wire contract.
    pub fn to_json(&self) -> Value {
        serde_json::json!({ "error": self.message })
    }

    /// Full cause chain, for the server-side log line only — never sent to the client.
    pub fn log_chain(&self) -> String {
        match &self.source {
            Some(src) => format!("{}: {:#}", self.message, src),
            None => self.message.clone(),
        }
    }
}

pub type XferResult<T> = Result<T, XferError>;

/// Adapts an arbitrary backend error into a `BackendUnavailable`, keeping the
/// original error as the logged cause and warning with the full chain. Use at
/// the edge of calls into the blob store or metadata store whose failure mode
/// isn't already a specific kind.
pub fn backend_unavailable<E>(context: &'static str) -> impl FnOnce(E) -> XferError
where
    E: Into<anyhow::Error>,
{
    move |err: E| {
        let source = err.into();
        tracing::warn!(context, error = %format!("{source:#}"), "backend call failed");
        XferError::backend_unavailable(context).with_source(source)
    }
}
