//! # restkv - An In-Memory Key-Value Store over HTTP
//!
//! restkv keeps string keys and byte values in memory and serves them over
//! plain HTTP/1.1: `PUT /{key}` stores the request body, `GET /{key}` reads
//! it back, `DELETE /{key}` removes it. Nothing is persisted, replicated or
//! expired; the data lives as long as the process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              restkv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ axum Router │───>│  Request    │                  │
//! │  │ (Listener)  │    │ (fallback)  │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │                   Store                      │   │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │                     │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use restkv::{serve, RequestHandler, Store};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let store = Arc::new(Store::new());
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     serve(listener, RequestHandler::new(store), std::future::pending()).await
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Thread-safe sharded store
//! - [`handler`]: Maps requests to store calls and outcomes
//! - [`server`]: The catch-all axum route and the serve loop
//! - [`config`]: Command-line configuration

pub mod config;
pub mod handler;
pub mod server;
pub mod storage;

pub use config::{Command, Config, ConfigError};
pub use handler::{Outcome, Reply, RequestHandler};
pub use server::{router, serve};
pub use storage::Store;

/// The default port restkv listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host restkv binds to (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of restkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
