//! Key-Value Service contract.

use serde::Serialize;

use crate::error::KvError;

/// One element of a bulk write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkEntry {
    pub key: String,
    pub value: String,
    /// `value` is base64 and must be decoded by the service before storage.
    pub base64: bool,
}

/// Remote key-value namespace.
///
/// Calls may block. A failed bulk call is treated as failed as a whole.
pub trait KvStore: Send + Sync {
    /// Every key starting with `prefix`, following pagination to the end.
    fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, KvError>;

    /// `Ok(None)` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    fn put_bulk(&self, entries: &[BulkEntry]) -> Result<(), KvError>;

    fn delete_bulk(&self, keys: &[String]) -> Result<(), KvError>;
}
