//! Error taxonomy shared by the reader, parser and smoother.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A directory or file that was expected on disk is absent.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A timestamp or numeric field could not be decoded.
    #[error("format error at {}:{line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// A row does not have the shape its log kind requires.
    #[error("parse error at {}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// Map an I/O error on `path`, keeping "file absent" distinguishable.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AnalysisError::NotFound { path }
        } else {
            AnalysisError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalysisError::NotFound { .. })
    }
}

/// Raised when an experiment has no usable `init_timestamp.log`.
#[derive(Debug, Error)]
#[error("init timestamp unavailable for {}: {reason}", path.display())]
pub struct InitTimestampUnavailable {
    pub path: PathBuf,
    pub reason: String,
}
