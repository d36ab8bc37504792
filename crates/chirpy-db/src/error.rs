use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures returned by every store operation.
///
/// `Io` and `Format` abort the operation that hit them. `NotFound`,
/// `Conflict` and `Unauthorized` are ordinary outcomes for the caller to map
/// onto its own responses.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed database file {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("invalid email or password")]
    Unauthorized,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn format(path: &Path, source: serde_json::Error) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
