//! Local file listing and content hashing.
//!
//! Lists every regular file under a folder, skipping hidden entries and
//! anything matching an ignore glob. `.gitignore` files are not consulted.

use std::io::Read;
use std::path::{Component, Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// A file found on disk, not yet hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Path relative to the listed folder, `/`-separated.
    pub original_path: String,
    pub full_path: PathBuf,
}

/// List files under `root`, sorted by relative path.
///
/// `ignore` globs are matched relative to `root` with gitignore semantics;
/// a glob naming a directory excludes everything below it.
pub fn list_files(root: &Path, ignore: &[String]) -> Result<Vec<LocalFile>, SyncError> {
    let meta = std::fs::metadata(root).map_err(|e| io_err(root, e))?;
    if !meta.is_dir() {
        return Err(io_err(
            root,
            std::io::Error::other("sync folder is not a directory"),
        ));
    }

    let mut overrides = OverrideBuilder::new(root);
    for pattern in ignore {
        overrides.add(&format!("!{pattern}"))?;
    }
    let overrides = overrides.build()?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .require_git(false)
        .follow_links(true)
        .overrides(overrides);

    let mut files = Vec::new();
    for result in builder.build() {
        let entry = result?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let full_path = entry.path().to_path_buf();
        let Ok(relative) = full_path.strip_prefix(root) else {
            continue;
        };
        let original_path =
            slash_path(relative).ok_or_else(|| SyncError::NonUtf8Path(full_path.clone()))?;
        files.push(LocalFile {
            original_path,
            full_path,
        });
    }

    files.sort_by(|a, b| a.original_path.cmp(&b.original_path));
    tracing::debug!(root = %root.display(), count = files.len(), "listed local files");
    Ok(files)
}

/// SHA-256 of a file's content, hex-encoded.
pub fn hash_file(path: &Path) -> Result<String, SyncError> {
    let mut file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| io_err(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// `None` if any component is not UTF-8.
fn slash_path(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
