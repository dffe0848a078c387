//! Filesystem view errors

use core_types::MemoryError;
use hal::{FileError, RecordError, VolumeHandle};
use thiserror::Error;

/// Errors produced while reading and listing directories
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsError {
    /// The storage protocol is missing on a handle
    #[error("Storage protocol unavailable on {handle}: {source}")]
    ProtocolUnavailable {
        handle: VolumeHandle,
        source: FileError,
    },

    /// Opening a volume root or a path failed
    #[error("Failed to open {path}: {source}")]
    OpenFailed { path: String, source: FileError },

    /// Querying file information failed
    #[error("Failed to get file info for {path}: {source}")]
    InfoFailed { path: String, source: FileError },

    /// The path names a file where a directory was required
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A read or seek on an open handle failed
    #[error("Read failed on {path}: {source}")]
    Read { path: String, source: FileError },

    /// The second pass returned fewer bytes than the first pass measured
    #[error("Directory {path} changed while reading: expected {expected} bytes, read {found}")]
    ShortRead {
        path: String,
        expected: usize,
        found: usize,
    },

    /// A record in the directory buffer could not be decoded
    #[error("Malformed directory record: {0}")]
    Malformed(#[from] RecordError),

    /// Pool allocation failed
    #[error(transparent)]
    OutOfResources(#[from] MemoryError),
}
