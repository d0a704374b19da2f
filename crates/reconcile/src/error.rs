//! Error types for reconciliation.
//!
//! A missing remote path is a first-class signal: inspection routines
//! that expect it match on [`Error::MissingPath`] and turn it into an
//! empty result. Everything else propagates to the enclosing stage.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while inspecting or mutating a host
#[derive(Debug, Error)]
pub enum Error {
    /// The command reported that a path it was given does not exist
    #[error("no such file or directory (from `{command}`)")]
    MissingPath { command: String },

    /// A computed path does not start with the root it was derived from
    #[error("path {path} is not under {root}")]
    PathPrefix { path: String, root: String },

    /// The unit cannot perform this operation on its own
    #[error("{unit} does not support {operation}")]
    Unsupported {
        unit: String,
        operation: &'static str,
    },

    /// A command exited unsuccessfully
    #[error("`{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// Local I/O failed
    #[error("I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A unit inside a plan failed
    #[error("{unit}")]
    Unit {
        unit: String,
        #[source]
        source: Box<Error>,
    },

    /// The scheduler thread pool could not be created
    #[error("failed to create scheduler thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the identity of the unit that raised this error
    pub fn in_unit(self, unit: impl Into<String>) -> Self {
        Self::Unit {
            unit: unit.into(),
            source: Box::new(self),
        }
    }

    pub fn is_missing_path(&self) -> bool {
        matches!(self, Self::MissingPath { .. })
    }

    /// The innermost error, skipping unit identity wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Unit { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
