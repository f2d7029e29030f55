//! Materialization error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error while downloading, verifying, unpacking or relocating an archive.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to download `{url}`: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("failed to decompress `{store_path}` ({compression}): {reason}")]
    DecompressionFailed {
        store_path: String,
        compression: String,
        reason: String,
    },

    #[error("{what} mismatch for `{store_path}`: expected {expected}, got {actual}")]
    HashMismatch {
        store_path: String,
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("failed to unpack `{store_path}`: {reason}")]
    Unpack { store_path: String, reason: String },

    #[error("failed to relocate `{}`: {reason}", path.display())]
    RelocationFailed { path: PathBuf, reason: String },
}

impl FetchError {
    pub(crate) fn unpack(store_path: &str, reason: impl ToString) -> Self {
        FetchError::Unpack {
            store_path: store_path.to_string(),
            reason: reason.to_string(),
        }
    }
}
