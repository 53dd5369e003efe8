//! Greedy, order-preserving packing of uploads into size-bounded batches.

use kvsync_core::FileEntry;

use crate::error::SyncError;

/// Files sent together in one bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub files: Vec<FileEntry>,
    pub total_size: u64,
}

/// Split `entries` into batches whose total size stays strictly under `limit`.
///
/// Entries keep their order; a new batch starts whenever the next entry would
/// bring the running total to `limit` or beyond. Every entry must already
/// carry its size, and an entry of `limit` bytes or more is rejected outright.
pub fn pack(entries: Vec<FileEntry>, limit: u64) -> Result<Vec<Batch>, SyncError> {
    let mut batches: Vec<Batch> = Vec::new();
    let mut current = Batch::default();

    for entry in entries {
        let size = entry
            .size
            .ok_or_else(|| SyncError::UnresolvedSize(entry.full_path.clone()))?;
        if size >= limit {
            return Err(SyncError::PayloadTooLarge {
                path: entry.full_path,
                size,
                limit,
            });
        }
        if !current.files.is_empty() && current.total_size + size >= limit {
            batches.push(std::mem::take(&mut current));
        }
        current.total_size += size;
        current.files.push(entry);
    }

    if !current.files.is_empty() {
        batches.push(current);
    }
    Ok(batches)
}
