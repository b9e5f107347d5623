// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of NordPeak.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Retention for dated files in the saves folder

use crate::error::{StorageError, StorageResult};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// Date encoded in `<prefix>_<YYYY-MM-DD>.<extension>`, if the name matches
fn dated_file_date(file_name: &str, prefix: &str, extension: &str) -> Option<NaiveDate> {
    let stem = file_name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

/// Delete all but the `keep` newest dated files for `prefix`.
///
/// Files are ordered by the date in their name, not by mtime. Returns the
/// deleted paths.
pub fn prune_dated_files(
    dir: &Path,
    prefix: &str,
    extension: &str,
    keep: usize,
) -> StorageResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dated: Vec<(NaiveDate, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))? {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(date) = dated_file_date(&name.to_string_lossy(), prefix, extension) {
            dated.push((date, path));
        }
    }

    if dated.len() <= keep {
        return Ok(Vec::new());
    }

    // Newest first
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = Vec::new();
    for (_, path) in dated.into_iter().skip(keep) {
        std::fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
        info!("Deleted old file: {}", path.display());
        removed.push(path);
    }

    Ok(removed)
}
