//! Input archive discovery.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use billing_core::{ArchiveErrorCode, Error, Result};
use tracing::{debug, warn};

/// Lists `*.zip` files directly inside `folder`, sorted by path.
///
/// A missing folder is an empty archive set; any other I/O error is fatal.
pub fn list_archives(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(folder = %folder.display(), "Data folder does not exist, nothing to ingest");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(Error::archive(
                ArchiveErrorCode::Unreadable,
                format!("cannot list {}: {}", folder.display(), e),
            ))
        }
    };

    let mut archives = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_zip(&path) {
            archives.push(path);
        }
    }
    archives.sort();

    debug!(folder = %folder.display(), count = archives.len(), "Listed archives");
    Ok(archives)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}
