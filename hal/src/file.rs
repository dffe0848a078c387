//! File protocol abstraction
//!
//! Mirrors the firmware file protocol: a handle can open children by name,
//! read (one directory record per call for directories), seek, report
//! information records and close.

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use core::ops::{Deref, DerefMut};
use core_types::Guid;
use thiserror::Error;

use crate::file_info::{FileInfo, FileSystemInfo};

/// Mode used when opening a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only
    Read,
    /// Read and write
    ReadWrite,
    /// Read, write, create if missing
    Create,
}

impl OpenMode {
    const READ: u64 = 0x0000_0000_0000_0001;
    const WRITE: u64 = 0x0000_0000_0000_0002;
    const CREATE: u64 = 0x8000_0000_0000_0000;

    /// Firmware mode bits
    pub fn bits(self) -> u64 {
        match self {
            Self::Read => Self::READ,
            Self::ReadWrite => Self::READ | Self::WRITE,
            Self::Create => Self::READ | Self::WRITE | Self::CREATE,
        }
    }
}

/// File protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported")]
    Unsupported,

    #[error("Buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },

    #[error("Device error")]
    DeviceError,

    #[error("Access denied")]
    AccessDenied,

    #[error("Write protected")]
    WriteProtected,

    #[error("Invalid parameter")]
    InvalidParameter,
}

/// An open file or directory
///
/// Implementations must tolerate `close` being called once, after which the
/// handle is not used again.
pub trait FileProtocol {
    /// Opens `name` relative to this handle
    ///
    /// A leading `\` resolves from the volume root. Components are separated
    /// by `\`; `.` and `..` are honored.
    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Box<dyn FileProtocol>, FileError>;

    /// Reads into `buffer`, returning the byte count
    ///
    /// For a directory each call returns exactly one encoded [`FileInfo`]
    /// record, or zero bytes at the end of the directory. A buffer too small
    /// for the next record yields [`FileError::BufferTooSmall`] without
    /// advancing.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, FileError>;

    /// Moves the read cursor; for directories only 0 is accepted
    fn set_position(&mut self, position: u64) -> Result<(), FileError>;

    /// Returns the file info record identified by `info_type`
    fn file_info(&mut self, info_type: &Guid) -> Result<FileInfo, FileError>;

    /// Returns the volume info record identified by `info_type`
    fn file_system_info(&mut self, info_type: &Guid) -> Result<FileSystemInfo, FileError>;

    /// Releases the handle
    fn close(&mut self);
}

/// Scoped ownership of an open handle
///
/// The handle is closed when the guard is dropped, on every exit path.
pub struct FileGuard {
    file: Box<dyn FileProtocol>,
}

impl FileGuard {
    pub fn new(file: Box<dyn FileProtocol>) -> Self {
        Self { file }
    }
}

impl core::fmt::Debug for FileGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileGuard").finish_non_exhaustive()
    }
}

impl Deref for FileGuard {
    type Target = dyn FileProtocol;

    fn deref(&self) -> &Self::Target {
        self.file.as_ref()
    }
}

impl DerefMut for FileGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.file.as_mut()
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        self.file.close();
    }
}
