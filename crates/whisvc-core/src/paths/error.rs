//! Path-related error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's configuration directory.
    #[error("Cannot determine user configuration directory")]
    NoConfigDir,

    /// An empty path was provided.
    #[error("Path cannot be empty")]
    EmptyPath,

    /// The install path must be absolute so the service can find it from any
    /// working directory.
    #[error("Install path {0} is not absolute")]
    NotAbsolute(PathBuf),

    /// A path was expected to be a directory but was not.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),
}
