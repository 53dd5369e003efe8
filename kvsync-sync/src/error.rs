//! Error types for kvsync-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use kvsync_core::KvError;

/// Orchestrator stage, used to tell the operator where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    Diffing,
    DryRunReporting,
    Executing,
    Committing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Scanning => "scanning",
            Stage::Diffing => "diffing",
            Stage::DryRunReporting => "dry-run reporting",
            Stage::Executing => "executing",
            Stage::Committing => "committing",
            Stage::Done => "done",
        })
    }
}

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal or ignore-pattern failure.
    #[error("cannot list local files: {0}")]
    Walk(#[from] ignore::Error),

    /// A file name that cannot be turned into a key.
    #[error("{0} is not valid UTF-8 and cannot be used as a key")]
    NonUtf8Path(PathBuf),

    /// A local file would be stored under the hash record's key.
    #[error(
        "{path} maps to key '{key}', which is the hash record; \
         ignore it or set a file prefix"
    )]
    RecordKeyCollision { path: String, key: String },

    /// The hash record could not be read.
    #[error("cannot load hash record: {0}")]
    RemoteCatalog(#[source] KvError),

    /// The hash record exists but is not a JSON object of strings.
    #[error("hash record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A single file cannot fit in one bulk request.
    #[error("{path} is {size} bytes; files must be smaller than {limit} bytes")]
    PayloadTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// An entry reached the packer without a resolved size.
    #[error("size of {0} was not resolved before packing")]
    UnresolvedSize(PathBuf),

    /// A bulk upload failed; earlier batches stay written.
    #[error(
        "upload of batch {batch}/{batches} failed after {completed} batch(es) were written; \
         hash record not updated: {source}"
    )]
    Upload {
        batch: usize,
        batches: usize,
        completed: usize,
        #[source]
        source: KvError,
    },

    /// The bulk delete failed after every upload succeeded.
    #[error(
        "removing stale entries failed after {uploaded_batches} batch(es) were written; \
         hash record not updated: {source}"
    )]
    Delete {
        uploaded_batches: usize,
        #[source]
        source: KvError,
    },

    /// Everything was written but the hash record could not be replaced.
    #[error(
        "remote entries were updated but the hash record could not be written; \
         it no longer matches the namespace until the next successful run: {source}"
    )]
    Commit {
        #[source]
        source: KvError,
    },

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Whether the remote namespace may already have been modified.
    pub fn has_side_effects(&self) -> bool {
        match self {
            SyncError::Upload { completed, .. } => *completed > 0,
            SyncError::Delete { .. } | SyncError::Commit { .. } => true,
            _ => false,
        }
    }
}

/// A run that ended in the failed state, with the stage it failed in.
#[derive(Debug, Error)]
#[error("sync failed while {stage}: {source}")]
pub struct SyncFailure {
    pub stage: Stage,
    #[source]
    pub source: SyncError,
}

impl SyncFailure {
    pub(crate) fn at(stage: Stage) -> impl FnOnce(SyncError) -> SyncFailure {
        move |source| SyncFailure { stage, source }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
