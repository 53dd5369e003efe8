//! Run configuration: remote credentials, key layout and sync options.
//!
//! Credentials are read from the environment. The `CLOUDFLARE_*` names win
//! over the legacy `CF_*` names; empty values count as unset.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::FileKey;

/// Ceiling for one bulk request body, slightly under the service's 100 MB cap.
pub const MAX_PAYLOAD: u64 = 99_000_000;

/// Default name of the hash record.
pub const DEFAULT_HASH_NAME: &str = "hashes";

/// Default number of concurrent file tasks (hashing, stat, reads).
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Upper bound accepted for `--concurrency`.
pub const MAX_CONCURRENCY: usize = 1024;

const ACCOUNT_ID: (&str, &str) = ("CLOUDFLARE_ACCOUNT_ID", "CF_ACCOUNT_ID");
const NAMESPACE_ID: (&str, &str) = ("CLOUDFLARE_NAMESPACE_ID", "CF_NAMESPACE_ID");
const API_TOKEN: (&str, &str) = ("CLOUDFLARE_API_TOKEN", "CF_API_TOKEN");
const AUTH_KEY: (&str, &str) = ("CLOUDFLARE_AUTH_KEY", "CF_AUTH_KEY");
const AUTH_EMAIL: (&str, &str) = ("CLOUDFLARE_AUTH_EMAIL", "CF_AUTH_EMAIL");

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// How requests authenticate against the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Scoped API token, sent as `Authorization: Bearer`.
    Token(String),
    /// Global API key plus account email.
    Key { key: String, email: String },
}

/// Identifiers and secrets needed to reach one KV namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub namespace_id: String,
    pub auth: Auth,
}

impl Credentials {
    /// Resolve credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |(current, legacy): (&str, &str)| {
            lookup(current)
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(legacy).filter(|v| !v.is_empty()))
        };

        let account_id = get(ACCOUNT_ID);
        let namespace_id = get(NAMESPACE_ID);
        let (Some(account_id), Some(namespace_id)) = (account_id.clone(), namespace_id.clone())
        else {
            let mut missing = Vec::new();
            if account_id.is_none() {
                missing.push(ACCOUNT_ID.0);
            }
            if namespace_id.is_none() {
                missing.push(NAMESPACE_ID.0);
            }
            return Err(ConfigError::MissingRequired(missing));
        };

        let auth = match (get(API_TOKEN), get(AUTH_KEY)) {
            (Some(token), _) => Auth::Token(token),
            (None, Some(key)) => {
                let email =
                    get(AUTH_EMAIL).ok_or(ConfigError::IncompleteAuth(AUTH_KEY.0, AUTH_EMAIL.0))?;
                Auth::Key { key, email }
            }
            (None, None) => return Err(ConfigError::MissingAuth(vec![AUTH_KEY.0, API_TOKEN.0])),
        };

        Ok(Self {
            account_id,
            namespace_id,
            auth,
        })
    }
}

// ---------------------------------------------------------------------------
// RemoteLayout
// ---------------------------------------------------------------------------

/// Where files and the hash record live inside the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    /// Prepended to every key the tool writes.
    pub prefix: String,
    /// Prepended to file keys only, after `prefix`.
    pub file_prefix: String,
    /// Name of the hash record, after `prefix`.
    pub hash_name: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            file_prefix: String::new(),
            hash_name: DEFAULT_HASH_NAME.to_string(),
        }
    }
}

impl RemoteLayout {
    /// `<prefix><hash_name>`
    pub fn record_key(&self) -> String {
        format!("{}{}", self.prefix, self.hash_name)
    }

    /// `<prefix><file_prefix><key>`
    pub fn object_key(&self, key: &FileKey) -> String {
        format!("{}{}{}", self.prefix, self.file_prefix, key)
    }
}

// ---------------------------------------------------------------------------
// SyncOptions
// ---------------------------------------------------------------------------

/// Everything one sync run needs besides the store itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub folder: PathBuf,
    /// Globs, relative to `folder`, of files to leave out.
    pub ignore: Vec<String>,
    pub layout: RemoteLayout,
    pub dry_run: bool,
    pub concurrency: usize,
    pub max_payload: u64,
}

impl SyncOptions {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            ignore: Vec::new(),
            layout: RemoteLayout::default(),
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY,
            max_payload: MAX_PAYLOAD,
        }
    }
}
