//! Domain types for the reconciliation engine.
//!
//! A [`Catalog`] maps [`FileKey`]s to content hashes. Two exist per run: the
//! local catalog built from disk and the remote catalog read from the hash
//! record. Catalogs are values; nothing mutates one in place.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Bytes left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// ---------------------------------------------------------------------------
// FileKey
// ---------------------------------------------------------------------------

/// URL-safe key derived from a file's folder-relative path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(pub String);

impl FileKey {
    /// Percent-encode `original_path` the way `encodeURIComponent` does, so
    /// `docs/a b.md` becomes `docs%2Fa%20b.md`.
    pub fn encode(original_path: &str) -> Self {
        Self(utf8_percent_encode(original_path, URI_COMPONENT).to_string())
    }

    /// Recover the original path for display.
    pub fn decode(&self) -> String {
        percent_decode_str(&self.0).decode_utf8_lossy().into_owned()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FileKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for FileKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// FileEntry
// ---------------------------------------------------------------------------

/// A local file taking part in a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub key: FileKey,
    /// Path relative to the synced folder, `/`-separated.
    pub original_path: String,
    pub full_path: PathBuf,
    /// Hex content digest.
    pub hash: String,
    /// Resolved only once the entry is selected for upload.
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn new(
        original_path: impl Into<String>,
        full_path: impl Into<PathBuf>,
        hash: impl Into<String>,
    ) -> Self {
        let original_path = original_path.into();
        Self {
            key: FileKey::encode(&original_path),
            original_path,
            full_path: full_path.into(),
            hash: hash.into(),
            size: None,
        }
    }

    /// Copy of this entry with its size resolved.
    pub fn with_size(&self, size: u64) -> Self {
        Self {
            size: Some(size),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Mapping of file key to content hash.
///
/// Serializes as the flat JSON object stored in the remote hash record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(BTreeMap<FileKey, String>);

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the local catalog from listed files.
    pub fn from_entries(entries: &[FileEntry]) -> Self {
        entries
            .iter()
            .map(|e| (e.key.clone(), e.hash.clone()))
            .collect()
    }

    /// Parse a stored hash record. An empty body is an empty catalog.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn get(&self, key: &FileKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &FileKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&FileKey, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }
}

impl FromIterator<(FileKey, String)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (FileKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (FileKey::from(k), v.to_owned()))
                .collect(),
        )
    }
}
