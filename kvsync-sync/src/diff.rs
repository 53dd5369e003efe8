//! Catalog comparison.

use kvsync_core::{Catalog, FileKey};

/// Keys to upload and keys to remove, each in catalog key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Present locally with a hash the remote catalog lacks or disagrees on.
    pub to_upload: Vec<FileKey>,
    /// Present remotely, absent locally.
    pub to_remove: Vec<FileKey>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_remove.is_empty()
    }
}

/// Compare the local catalog against the remote one.
///
/// Hashes are compared as plain strings.
pub fn diff(local: &Catalog, remote: &Catalog) -> DiffResult {
    let to_upload = local
        .iter()
        .filter(|(key, hash)| remote.get(key) != Some(*hash))
        .map(|(key, _)| key.clone())
        .collect();
    let to_remove = remote
        .iter()
        .filter(|(key, _)| !local.contains(key))
        .map(|(key, _)| key.clone())
        .collect();
    DiffResult {
        to_upload,
        to_remove,
    }
}
