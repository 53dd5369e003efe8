//! Hash record persistence: the remote catalog of what was last synced.
//!
//! The record is a single JSON object at `<prefix><hash_name>` mapping file
//! keys to content hashes. It is read once at the start of a run and replaced
//! wholesale at the end of a successful one, never patched.

use kvsync_core::{Catalog, FileEntry, KvError, KvStore, RemoteLayout};

use crate::error::SyncError;

/// Local catalog for the listed files.
pub fn build_local(entries: &[FileEntry]) -> Catalog {
    Catalog::from_entries(entries)
}

/// Load the remote catalog.
///
/// Returns an empty catalog if the record does not exist yet.
pub fn load_remote(store: &dyn KvStore, layout: &RemoteLayout) -> Result<Catalog, SyncError> {
    let key = layout.record_key();
    match store.get(&key).map_err(SyncError::RemoteCatalog)? {
        None => {
            tracing::debug!(key = %key, "no hash record yet");
            Ok(Catalog::new())
        }
        Some(bytes) => Ok(Catalog::from_json(&bytes)?),
    }
}

/// Replace the hash record with `catalog`.
pub fn commit(
    store: &dyn KvStore,
    layout: &RemoteLayout,
    catalog: &Catalog,
) -> Result<(), SyncError> {
    let json = catalog.to_json()?;
    store
        .put(&layout.record_key(), &json)
        .map_err(|source: KvError| SyncError::Commit { source })
}
