//! `kvsync list`: print the keys stored in the namespace.

use anyhow::{Context, Result};
use clap::Args;

use kvsync_core::{Credentials, KvStore};
use kvsync_remote::CloudflareKv;

/// Arguments for `kvsync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list keys starting with this prefix.
    #[arg(short, long)]
    pub prefix: Option<String>,
}

impl ListArgs {
    pub fn run(self, api_base: &str) -> Result<()> {
        let credentials = Credentials::from_env().context("Cloudflare credentials are incomplete")?;
        let store = CloudflareKv::with_api_base(&credentials, api_base);

        let keys = store
            .list(self.prefix.as_deref())
            .context("could not list namespace keys")?;
        for key in &keys {
            println!("{key}");
        }
        tracing::info!(count = keys.len(), "listed keys");
        Ok(())
    }
}
