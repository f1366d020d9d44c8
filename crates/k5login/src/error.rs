//! Error types for k5login reconciliation.
//!
//! Mutation failures are surfaced to the caller unmodified; nothing here is
//! retried. Probe-side failures never reach this type, they are folded into
//! "absent" by [`crate::probe`].

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while converging a k5login file.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation needed the file to exist but it does not
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The operating system refused the operation
    #[error("permission denied: {}: {source}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A mode string that is not an octal permission value
    #[error("invalid mode {value:?}: {reason}")]
    InvalidMode {
        /// The rejected input
        value: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// The resource path is not an absolute path
    #[error("path must be absolute: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A principal that cannot be written one-per-line
    #[error("principal {0:?} contains a line terminator")]
    UnrepresentablePrincipal(String),

    /// Security context query or update failed
    #[error("security context error on {}: {message}", .path.display())]
    Context { path: PathBuf, message: String },

    /// Any other I/O failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Classify an I/O error raised while operating on `path`.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    pub(crate) fn invalid_mode(value: &str, reason: &'static str) -> Self {
        Self::InvalidMode {
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error means the file was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error came from an OS permission check.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Result type for k5login operations.
pub type Result<T> = std::result::Result<T, Error>;
