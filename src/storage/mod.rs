//! Storage Module
//!
//! This module provides the in-memory key-value store for restkv.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **No expiry, no persistence**: entries live until deleted or the process exits
//!
//! ## Example
//!
//! ```
//! use restkv::storage::Store;
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::new());
//!
//! store.put(Bytes::from("name"), Bytes::from("newvalue"));
//! assert_eq!(store.get(b"name"), Some(Bytes::from("newvalue")));
//! assert_eq!(store.get(b"missing"), None);
//! ```

pub mod engine;

pub use engine::{StorageStats, Store};
