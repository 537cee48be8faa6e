// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Internal failure of a single sub-check.
///
/// Never leaves the crate as an error value: probes log it and count the
/// sub-check as "signal absent".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("resource unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transient i/o failure: {0}")]
    Transient(String),

    #[error("unexpected format in {source_name}: {detail}")]
    UnexpectedFormat { source_name: String, detail: String },
}

/// Coarse classification of [`ProbeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ResourceUnavailable,
    TransientIo,
    UnexpectedFormat,
}

impl ProbeError {
    pub fn unavailable(path: impl AsRef<Path>, source: io::Error) -> Self {
        ProbeError::Unavailable {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn unexpected_format(source_name: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        ProbeError::UnexpectedFormat {
            source_name: source_name.as_ref().display().to_string(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Unavailable { .. } => ErrorKind::ResourceUnavailable,
            ProbeError::Transient(_) => ErrorKind::TransientIo,
            ProbeError::UnexpectedFormat { .. } => ErrorKind::UnexpectedFormat,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid port range {start}..={end}")]
    InvalidPortRange { start: u16, end: u16 },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}
