//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`] raised while streaming data
    #[error(transparent)]
    StreamError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`serde_json::Error`] raised while encoding a header
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Transparent wrapper for [`glob::PatternError`]
    #[error(transparent)]
    PatternError(#[from] glob::PatternError),

    /// archive could not be opened
    #[error("unable to open archive {}", .path.display())]
    OpenFailed {
        /// Path that was being opened
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// file is an invalid archive
    #[error("file is an invalid archive: {0}")]
    #[diagnostic(help("the header size block or the JSON header could not be decoded"))]
    InvalidArchive(String),

    /// archive handle has not been opened
    #[error("archive is not open")]
    NotOpened,

    /// no such file or directory
    #[error("no such file or directory: {0}")]
    NodeNotFound(String),

    /// not a directory
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// illegal operation on a directory
    #[error("illegal operation on a directory: {0}")]
    IsADirectory(String),

    /// symlink resolves outside of the directory being packed
    #[error("{}: file links out of the package", .0.display())]
    LinkEscapesRoot(PathBuf),

    /// path can not be used as an archive entry
    #[error("invalid archive path: {0}")]
    InvalidPath(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
