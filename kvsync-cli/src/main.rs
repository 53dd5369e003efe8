//! kvsync: push the contents of a folder to a Cloudflare Workers KV namespace.
//!
//! # Usage
//!
//! ```text
//! kvsync sync <folder> [-i <glob>]... [-p <prefix>] [-f <file-prefix>] [--hash <name>] [--dry-run]
//! kvsync list [--prefix <prefix>]
//! ```
//!
//! Credentials are read from `CLOUDFLARE_ACCOUNT_ID`, `CLOUDFLARE_NAMESPACE_ID`
//! and either `CLOUDFLARE_API_TOKEN` or `CLOUDFLARE_AUTH_KEY` +
//! `CLOUDFLARE_AUTH_EMAIL` (legacy `CF_*` names are accepted too).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{list::ListArgs, sync::SyncArgs};
use kvsync_remote::API_BASE;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "kvsync",
    version,
    about = "Push the contents of a folder to Cloudflare Workers KV",
    long_about = None,
)]
struct Cli {
    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API root to talk to instead of the public Cloudflare endpoint.
    #[arg(long, global = true, env = "KVSYNC_API_BASE", default_value = API_BASE, hide = true)]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload changed files, remove stale entries, update the hash record.
    Sync(SyncArgs),

    /// List keys stored in the namespace.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(&cli.api_base),
        Commands::List(args) => args.run(&cli.api_base),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
