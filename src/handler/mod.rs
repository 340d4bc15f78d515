//! Request Handler Module
//!
//! This module maps inbound requests onto the store. It knows nothing
//! about connections: a request is a method, a target and a body, and the
//! result is a [`Reply`] carrying an [`Outcome`] and a payload.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  axum Router    │  (server module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ RequestHandler  │  (this module)
//! │                 │
//! │  - Extract key  │
//! │  - Dispatch     │
//! │  - Map outcome  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Method   | Target   | Success             | Failure                 |
//! |----------|----------|---------------------|-------------------------|
//! | `GET`    | `/{key}` | 200, body = value   | 400 no key, 404 missing |
//! | `PUT`    | `/{key}` | 201, empty          | 400 no key, 500 body    |
//! | `DELETE` | `/{key}` | 200, empty          | 400 no key              |
//! | other    | any      | 405, empty          |                         |

pub mod dispatch;

pub use dispatch::{
    extract_key, HandlerError, Operation, Outcome, Reply, RequestHandler, CONTENT_TYPE,
    DEFAULT_MAX_BODY_SIZE,
};
