//! Request Dispatch
//!
//! Turns one inbound request into exactly one store call and a [`Reply`].
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RequestHandler                          │
//! │                                                             │
//! │  ┌──────────────────┐    ┌─────────────┐    ┌───────────┐   │
//! │  │ Operation::parse │───>│  execute()  │───>│   Reply   │   │
//! │  └────────┬─────────┘    └──────┬──────┘    └───────────┘   │
//! │           │ HandlerError        │                 ▲         │
//! │           └─────────────────────┼─────────────────┘         │
//! │                                 ▼                           │
//! │                               Store                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure ends at this boundary as a `Reply`; nothing propagates to
//! the HTTP layer.

use crate::storage::Store;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Media type attached to every reply.
pub const CONTENT_TYPE: &str = "application/json";

/// Default maximum write payload (1 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// The categorical result of handling one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Created,
    NotFound,
    Malformed,
    Unsupported,
    InternalFault,
}

impl From<Outcome> for StatusCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ok => StatusCode::OK,
            Outcome::Created => StatusCode::CREATED,
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::Malformed => StatusCode::BAD_REQUEST,
            Outcome::Unsupported => StatusCode::METHOD_NOT_ALLOWED,
            Outcome::InternalFault => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What the handler answers: an outcome plus a payload, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub outcome: Outcome,
    pub payload: Bytes,
}

impl Reply {
    pub fn new(outcome: Outcome, payload: impl Into<Bytes>) -> Self {
        Self {
            outcome,
            payload: payload.into(),
        }
    }

    pub fn empty(outcome: Outcome) -> Self {
        Self::new(outcome, Bytes::new())
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            StatusCode::from(self.outcome),
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            self.payload,
        )
            .into_response()
    }
}

/// Why a request could not be turned into a store call.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The target has no key after the leading `/`
    #[error("key param missing")]
    MissingKey,

    /// The key contains a broken percent-escape
    #[error("invalid escape in key: {0:?}")]
    InvalidKeyEncoding(String),

    /// Not one of GET, PUT, DELETE
    #[error("method {0} not allowed")]
    UnsupportedOperation(Method),

    /// Reading the write payload failed
    #[error("reading request body: {0}")]
    InternalFault(#[from] axum::Error),
}

impl HandlerError {
    pub fn outcome(&self) -> Outcome {
        match self {
            HandlerError::MissingKey | HandlerError::InvalidKeyEncoding(_) => Outcome::Malformed,
            HandlerError::UnsupportedOperation(_) => Outcome::Unsupported,
            HandlerError::InternalFault(_) => Outcome::InternalFault,
        }
    }
}

impl From<HandlerError> for Reply {
    fn from(err: HandlerError) -> Self {
        match err.outcome() {
            Outcome::Unsupported => Reply::empty(Outcome::Unsupported),
            outcome => Reply::new(outcome, err.to_string()),
        }
    }
}

/// A request reduced to the store call it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read { key: Bytes },
    Write { key: Bytes, value: Bytes },
    Delete { key: Bytes },
}

impl Operation {
    /// Interprets `method` and `target`, reading `body` only for writes.
    ///
    /// The method is checked first, so an unsupported method is reported
    /// even when the target has no key. For writes the key is checked
    /// before the payload is read; a payload longer than `limit` bytes is
    /// a read failure.
    pub async fn parse(
        method: &Method,
        target: &str,
        body: Body,
        limit: usize,
    ) -> Result<Self, HandlerError> {
        match method.as_str() {
            "GET" => Ok(Operation::Read {
                key: extract_key(target)?,
            }),
            "PUT" => {
                let key = extract_key(target)?;
                let value = to_bytes(body, limit).await?;
                Ok(Operation::Write { key, value })
            }
            "DELETE" => Ok(Operation::Delete {
                key: extract_key(target)?,
            }),
            _ => Err(HandlerError::UnsupportedOperation(method.clone())),
        }
    }
}

/// Extracts the key from a request target.
///
/// The key is the percent-decoded path after the leading `/`. Query string
/// and fragment are ignored. A bare `/` has no key.
///
/// ```
/// use restkv::handler::extract_key;
///
/// assert_eq!(&extract_key("/name").unwrap()[..], b"name");
/// assert_eq!(&extract_key("/a%20b?x=1").unwrap()[..], b"a b");
/// assert!(extract_key("/").is_err());
/// ```
pub fn extract_key(target: &str) -> Result<Bytes, HandlerError> {
    let path = match target.find(['?', '#']) {
        Some(pos) => &target[..pos],
        None => target,
    };

    let raw = path.strip_prefix('/').ok_or(HandlerError::MissingKey)?;
    let key = percent_decode(raw)?;
    if key.is_empty() {
        return Err(HandlerError::MissingKey);
    }

    Ok(Bytes::from(key))
}

fn percent_decode(raw: &str) -> Result<Vec<u8>, HandlerError> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| HandlerError::InvalidKeyEncoding(raw.to_string()))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    Ok(decoded)
}

/// Translates requests into store calls.
///
/// Cheap to clone; every clone shares the same [`Store`].
#[derive(Debug, Clone)]
pub struct RequestHandler {
    store: Arc<Store>,
    max_body_size: usize,
}

impl RequestHandler {
    /// Creates a new request handler backed by `store`.
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_max_body_size(store, DEFAULT_MAX_BODY_SIZE)
    }

    pub fn with_max_body_size(store: Arc<Store>, max_body_size: usize) -> Self {
        Self {
            store,
            max_body_size,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Handles one request whose write payload is streamed from `body`.
    pub async fn dispatch(&self, method: &Method, target: &str, body: Body) -> Reply {
        match Operation::parse(method, target, body, self.max_body_size).await {
            Ok(operation) => self.execute(operation),
            Err(err) => {
                match &err {
                    HandlerError::InternalFault(_) => {
                        warn!(%method, uri = target, error = %err, "Failed to read request")
                    }
                    _ => debug!(%method, uri = target, error = %err, "Rejected request"),
                }
                err.into()
            }
        }
    }

    /// Runs a parsed operation against the store.
    pub fn execute(&self, operation: Operation) -> Reply {
        match operation {
            Operation::Read { key } => match self.store.get(&key) {
                Some(value) => {
                    debug!(key = ?key, len = value.len(), "GET hit");
                    Reply::new(Outcome::Ok, value)
                }
                None => {
                    debug!(key = ?key, "GET miss");
                    Reply::empty(Outcome::NotFound)
                }
            },
            Operation::Write { key, value } => {
                debug!(key = ?key, len = value.len(), "PUT");
                self.store.put(key, value);
                Reply::empty(Outcome::Created)
            }
            Operation::Delete { key } => {
                let removed = self.store.delete(&key);
                debug!(key = ?key, removed, "DELETE");
                Reply::empty(Outcome::Ok)
            }
        }
    }
}
