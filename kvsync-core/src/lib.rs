//! kvsync core library: domain types, configuration, the key-value store
//! contract and errors.
//!
//! - [`types`]: [`FileKey`], [`FileEntry`], [`Catalog`]
//! - [`config`]: [`Credentials`], [`RemoteLayout`], [`SyncOptions`]
//! - [`kv`]: [`KvStore`]
//! - `memory`: the in-process `MemoryKv`, behind the `test-utils` feature
//! - [`error`]: [`ConfigError`], [`KvError`]

pub mod config;
pub mod error;
pub mod kv;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod types;

pub use config::{
    Auth, Credentials, RemoteLayout, SyncOptions, DEFAULT_CONCURRENCY, DEFAULT_HASH_NAME,
    MAX_CONCURRENCY, MAX_PAYLOAD,
};
pub use error::{ConfigError, KvError, KvOp};
pub use kv::{BulkEntry, KvStore};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{KvCall, MemoryKv};
pub use types::{Catalog, FileEntry, FileKey};
