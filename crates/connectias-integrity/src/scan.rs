// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! Fail-closed filesystem helpers shared by the probes.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::ProbeError;

/// First path in the list that exists (symlinks followed, like `stat`)
pub fn first_existing(paths: &[PathBuf]) -> Option<&Path> {
    paths.iter().map(PathBuf::as_path).find(|path| path.exists())
}

/// Marker hit inside a line-oriented text source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerHit {
    pub marker: String,
    pub line: String,
}

/// Scan `path` line by line for any of `markers` (lowercase), comparing
/// against the lowercased line.
///
/// Reads through to the end of the listing or the first hit. Lines need not
/// be valid UTF-8.
pub fn find_marker_in_lines(path: &Path, markers: &[String]) -> Result<Option<MarkerHit>, ProbeError> {
    if markers.is_empty() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| ProbeError::unavailable(path, e))?;
    let reader = BufReader::new(file);

    for chunk in reader.split(b'\n') {
        let raw = chunk.map_err(|e| {
            ProbeError::Transient(format!("read of {} interrupted: {}", path.display(), e))
        })?;
        let line = String::from_utf8_lossy(&raw).to_lowercase();

        if let Some(marker) = markers.iter().find(|m| line.contains(m.as_str())) {
            return Ok(Some(MarkerHit {
                marker: marker.clone(),
                line: line.trim().to_string(),
            }));
        }
    }

    Ok(None)
}
