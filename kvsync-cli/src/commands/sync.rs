//! `kvsync sync <folder>`: reconcile a namespace with a local folder.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Args;
use colored::Colorize;

use kvsync_core::{
    Credentials, RemoteLayout, SyncOptions, DEFAULT_CONCURRENCY, DEFAULT_HASH_NAME,
    MAX_CONCURRENCY,
};
use kvsync_remote::CloudflareKv;
use kvsync_sync::{pipeline, DryRunReport, SyncOutcome, SyncReport};

/// Arguments for `kvsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Folder whose files should end up in the namespace.
    pub folder: PathBuf,

    /// Leave out files matching this glob (repeatable).
    ///
    /// Globs follow .gitignore rules: one without a `/` matches at any depth
    /// (`*.md` also drops `docs/a.md`), and naming a directory drops
    /// everything below it. Use a leading `/` to anchor at the folder root.
    #[arg(short, long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Prefix for every key written to the namespace.
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Extra prefix for file keys, applied after `--prefix`.
    ///
    /// Needed when a file at the folder root has the hash record's name.
    #[arg(short = 'f', long = "file-prefix", default_value = "")]
    pub file_prefix: String,

    /// Name of the hash record.
    #[arg(short = 'H', long = "hash", default_value = DEFAULT_HASH_NAME)]
    pub hash_name: String,

    /// Show what would change without touching the namespace.
    #[arg(short, long)]
    pub dry_run: bool,

    /// Maximum number of files hashed or read at once.
    #[arg(
        short = 'j',
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_CONCURRENCY as u64),
    )]
    pub concurrency: usize,
}

impl SyncArgs {
    pub fn run(self, api_base: &str) -> Result<()> {
        let credentials = Credentials::from_env().context("Cloudflare credentials are incomplete")?;
        let store = Arc::new(CloudflareKv::with_api_base(&credentials, api_base));

        let options = SyncOptions {
            ignore: self.ignore,
            layout: RemoteLayout {
                prefix: self.prefix,
                file_prefix: self.file_prefix,
                hash_name: self.hash_name,
            },
            dry_run: self.dry_run,
            concurrency: self.concurrency,
            ..SyncOptions::new(&self.folder)
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("could not start async runtime")?;

        let outcome = match runtime.block_on(pipeline::run(store, &options)) {
            Ok(outcome) => outcome,
            Err(failure) => {
                if failure.source.has_side_effects() {
                    eprintln!(
                        "{} the namespace was partially updated; re-run to finish the sync",
                        "warning:".yellow().bold()
                    );
                }
                return Err(failure)
                    .with_context(|| format!("sync failed for '{}'", self.folder.display()));
            }
        };

        match outcome {
            SyncOutcome::DryRun(report) => print_dry_run(&report),
            SyncOutcome::Synced(report) => print_synced(&report),
        }
        Ok(())
    }
}

/// `Upload 1 file:` / `Remove 0 files.`
fn heading(verb: &str, count: usize) -> String {
    let noun = if count == 1 { "file" } else { "files" };
    let end = if count == 0 { '.' } else { ':' };
    format!("{verb} {count} {noun}{end}")
}

fn print_dry_run(report: &DryRunReport) {
    println!("(Dry run, no files will be modified.)");
    println!("{}", heading("Upload", report.to_upload.len()));
    for path in &report.to_upload {
        println!("- {path}");
    }
    println!("{}", heading("Remove", report.to_remove.len()));
    for path in &report.to_remove {
        println!("- {path}");
    }
}

fn print_synced(report: &SyncReport) {
    if !report.committed {
        println!(
            "{} already up to date ({} unchanged)",
            "✓".green(),
            report.unchanged
        );
        return;
    }

    let batches = report.batches.len();
    println!(
        "{} in {batches} batch{}",
        heading("Uploaded", report.uploaded.len()).trim_end_matches([':', '.']),
        if batches == 1 { "" } else { "es" }
    );
    println!(
        "{}",
        heading("Removed", report.removed.len()).trim_end_matches([':', '.'])
    );
    println!(
        "{} hash record updated ({} unchanged)",
        "✓".green(),
        report.unchanged
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_pluralises_and_punctuates() {
        assert_eq!(heading("Upload", 0), "Upload 0 files.");
        assert_eq!(heading("Upload", 1), "Upload 1 file:");
        assert_eq!(heading("Remove", 3), "Remove 3 files:");
    }
}
