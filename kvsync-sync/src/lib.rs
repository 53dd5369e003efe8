//! # kvsync-sync
//!
//! Reconciliation engine: makes a remote key-value namespace hold exactly one
//! entry per local file, tracked by a single hash record.
//!
//! Call [`pipeline::run`] with a [`kvsync_core::KvStore`] and
//! [`kvsync_core::SyncOptions`]. The building blocks are public for reuse:
//! [`lister`], [`catalog`], [`diff`](mod@diff) and [`packer`].

pub mod catalog;
pub mod diff;
pub mod error;
mod fanout;
pub mod lister;
pub mod packer;
pub mod pipeline;

pub use diff::{diff, DiffResult};
pub use error::{Stage, SyncError, SyncFailure};
pub use packer::{pack, Batch};
pub use pipeline::{run, BatchSummary, DryRunReport, SyncOutcome, SyncReport};
