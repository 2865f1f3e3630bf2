// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output delivery — atomic save of the finished PDF plus its SHA-256.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use vpdf_core::error::Result;

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A file that has been fully written to its final name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: usize,
    pub sha256: String,
}

/// Write `data` to `dir/file_name` through a temporary file in the same
/// directory, so readers never observe a partial PDF.
#[instrument(skip(data), fields(bytes = data.len()))]
pub fn save_atomic(dir: &Path, file_name: &str, data: &[u8]) -> Result<SavedFile> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|err| err.error)?;

    let sha256 = hash_bytes(data);
    info!(path = %path.display(), %sha256, "File saved");
    Ok(SavedFile {
        path,
        bytes: data.len(),
        sha256,
    })
}
