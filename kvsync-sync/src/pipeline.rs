//! Sync orchestration: scan, diff, then either report (dry run) or execute
//! and commit.
//!
//! ```text
//! Scanning → Diffing → DryRunReporting
//!                    → Executing → Committing → Done
//! ```
//!
//! Any stage may end the run with a [`SyncFailure`]. Catalogs and plans are
//! passed from stage to stage as values.
//!
//! The hash record is written last. A run interrupted before the commit
//! leaves the record describing the previous state, so the next run re-uploads
//! whatever was written but not recorded. Uploaded batches are never rolled
//! back.

use std::collections::HashSet;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use kvsync_core::{BulkEntry, Catalog, FileEntry, FileKey, KvStore, RemoteLayout, SyncOptions};

use crate::catalog;
use crate::diff::{diff, DiffResult};
use crate::error::{io_err, Stage, SyncError, SyncFailure};
use crate::fanout::{blocking, map_blocking};
use crate::lister::{hash_file, list_files, LocalFile};
use crate::packer::{pack, Batch};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a dry run would do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DryRunReport {
    /// Original paths of files that would be uploaded.
    pub to_upload: Vec<String>,
    /// Decoded keys that would be removed.
    pub to_remove: Vec<String>,
}

/// One bulk request that went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// 1-based position.
    pub index: usize,
    pub files: usize,
    pub bytes: u64,
}

/// What a completed sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Original paths of uploaded files.
    pub uploaded: Vec<String>,
    /// Decoded keys that were removed.
    pub removed: Vec<String>,
    pub batches: Vec<BatchSummary>,
    /// Local files whose remote copy was already current.
    pub unchanged: usize,
    /// Whether the hash record was rewritten. False when nothing changed.
    pub committed: bool,
}

/// Terminal success of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    DryRun(DryRunReport),
    Synced(SyncReport),
}

// ---------------------------------------------------------------------------
// Stage values
// ---------------------------------------------------------------------------

/// Output of scanning: local files with hashes, and both catalogs.
#[derive(Debug, Clone)]
struct Scanned {
    entries: Vec<FileEntry>,
    local: Catalog,
    remote: Catalog,
}

/// Output of diffing.
#[derive(Debug, Clone)]
struct Plan {
    local: Catalog,
    diff: DiffResult,
    /// Entries for `diff.to_upload`, in listing order.
    uploads: Vec<FileEntry>,
}

impl Plan {
    fn dry_run_report(&self) -> DryRunReport {
        DryRunReport {
            to_upload: self.uploads.iter().map(|e| e.original_path.clone()).collect(),
            to_remove: self.diff.to_remove.iter().map(FileKey::decode).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run one sync of `options.folder` against `store`.
pub async fn run(
    store: Arc<dyn KvStore>,
    options: &SyncOptions,
) -> Result<SyncOutcome, SyncFailure> {
    enter(Stage::Scanning);
    let scanned = scan(store.clone(), options)
        .await
        .map_err(SyncFailure::at(Stage::Scanning))?;

    enter(Stage::Diffing);
    let plan = build_plan(scanned);
    tracing::info!(
        upload = plan.uploads.len(),
        remove = plan.diff.to_remove.len(),
        "computed diff"
    );

    if options.dry_run {
        enter(Stage::DryRunReporting);
        return Ok(SyncOutcome::DryRun(plan.dry_run_report()));
    }

    let unchanged = plan.local.len().saturating_sub(plan.diff.to_upload.len());
    if plan.diff.is_empty() {
        enter(Stage::Done);
        tracing::info!("remote already up to date");
        return Ok(SyncOutcome::Synced(SyncReport {
            unchanged,
            ..SyncReport::default()
        }));
    }

    enter(Stage::Executing);
    let mut report = execute(store.clone(), options, &plan)
        .await
        .map_err(SyncFailure::at(Stage::Executing))?;
    report.unchanged = unchanged;

    enter(Stage::Committing);
    let layout = options.layout.clone();
    let local = plan.local;
    blocking(move || catalog::commit(store.as_ref(), &layout, &local))
        .await
        .map_err(SyncFailure::at(Stage::Committing))?;
    report.committed = true;

    enter(Stage::Done);
    Ok(SyncOutcome::Synced(report))
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "entering stage");
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

async fn scan(store: Arc<dyn KvStore>, options: &SyncOptions) -> Result<Scanned, SyncError> {
    let layout = options.layout.clone();
    let (entries, remote) = tokio::try_join!(
        scan_local(options),
        blocking(move || catalog::load_remote(store.as_ref(), &layout)),
    )?;
    check_record_key(&entries, &options.layout)?;
    let local = catalog::build_local(&entries);
    Ok(Scanned {
        entries,
        local,
        remote,
    })
}

/// No local file may share its remote key with the hash record.
fn check_record_key(entries: &[FileEntry], layout: &RemoteLayout) -> Result<(), SyncError> {
    let record = layout.record_key();
    match entries.iter().find(|e| layout.object_key(&e.key) == record) {
        Some(entry) => Err(SyncError::RecordKeyCollision {
            path: entry.original_path.clone(),
            key: record,
        }),
        None => Ok(()),
    }
}

async fn scan_local(options: &SyncOptions) -> Result<Vec<FileEntry>, SyncError> {
    let folder = options.folder.clone();
    let ignore = options.ignore.clone();
    let files = blocking(move || list_files(&folder, &ignore)).await?;
    map_blocking(files, options.concurrency, |file: LocalFile| {
        let hash = hash_file(&file.full_path)?;
        Ok(FileEntry::new(file.original_path, file.full_path, hash))
    })
    .await
}

// ---------------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------------

fn build_plan(scanned: Scanned) -> Plan {
    let diff = diff(&scanned.local, &scanned.remote);
    let selected: HashSet<&FileKey> = diff.to_upload.iter().collect();
    let uploads = scanned
        .entries
        .iter()
        .filter(|e| selected.contains(&e.key))
        .cloned()
        .collect();
    Plan {
        local: scanned.local,
        diff,
        uploads,
    }
}

// ---------------------------------------------------------------------------
// Executing
// ---------------------------------------------------------------------------

async fn execute(
    store: Arc<dyn KvStore>,
    options: &SyncOptions,
    plan: &Plan,
) -> Result<SyncReport, SyncError> {
    let sized = map_blocking(plan.uploads.clone(), options.concurrency, |entry: FileEntry| {
        let meta =
            std::fs::metadata(&entry.full_path).map_err(|e| io_err(&entry.full_path, e))?;
        Ok(entry.with_size(meta.len()))
    })
    .await?;
    let batches = pack(sized, options.max_payload)?;
    let total = batches.len();

    let mut report = SyncReport::default();
    for (i, batch) in batches.into_iter().enumerate() {
        let index = i + 1;
        let summary = BatchSummary {
            index,
            files: batch.files.len(),
            bytes: batch.total_size,
        };
        tracing::info!(
            batch = index,
            of = total,
            files = summary.files,
            bytes = summary.bytes,
            "uploading batch"
        );
        for file in &batch.files {
            tracing::info!("- {}{}", options.layout.prefix, file.original_path);
        }

        let uploaded: Vec<String> = batch
            .files
            .iter()
            .map(|f| f.original_path.clone())
            .collect();
        let entries = read_batch(batch, options).await?;
        let store = store.clone();
        blocking(move || {
            store.put_bulk(&entries).map_err(|source| SyncError::Upload {
                batch: index,
                batches: total,
                completed: index - 1,
                source,
            })
        })
        .await?;

        report.uploaded.extend(uploaded);
        report.batches.push(summary);
    }

    if !plan.diff.to_remove.is_empty() {
        let keys: Vec<String> = plan
            .diff
            .to_remove
            .iter()
            .map(|k| options.layout.object_key(k))
            .collect();
        tracing::info!(count = keys.len(), "removing stale entries");
        for key in &keys {
            tracing::info!("- {key}");
        }
        let store = store.clone();
        blocking(move || {
            store.delete_bulk(&keys).map_err(|source| SyncError::Delete {
                uploaded_batches: total,
                source,
            })
        })
        .await?;
        report.removed = plan.diff.to_remove.iter().map(FileKey::decode).collect();
    }

    Ok(report)
}

/// Read and base64-encode every file of one batch.
async fn read_batch(batch: Batch, options: &SyncOptions) -> Result<Vec<BulkEntry>, SyncError> {
    let layout = options.layout.clone();
    map_blocking(batch.files, options.concurrency, move |entry: FileEntry| {
        let bytes = std::fs::read(&entry.full_path).map_err(|e| io_err(&entry.full_path, e))?;
        Ok(BulkEntry {
            key: layout.object_key(&entry.key),
            value: STANDARD.encode(bytes),
            base64: true,
        })
    })
    .await
}
