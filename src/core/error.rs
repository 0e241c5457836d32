//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for the `core` module.
///
/// Per-entry and per-file failures never surface here; scanning, recursive
/// selection and reading skip them. What remains are failures that end a whole
/// operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically writing the output document.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// The configured output file is also one of the files to be read.
    #[error("Output path is also a selected source: {0}")]
    OutputIsSource(PathBuf),

    /// A worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Represents a path that was expected to be a directory but was not.
    #[error("Path is not a valid directory: {0}")]
    NotADirectory(PathBuf),
}
