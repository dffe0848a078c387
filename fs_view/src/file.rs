//! Volume and file helpers
//!
//! Opening a path goes volume handle → storage interface → volume root →
//! path. The root handle is closed as soon as the path is open.

use core_types::{align_to_page, MemoryError, Pooled};
use hal::{FileGuard, OpenMode, VolumeHandle, VolumeProvider};
use services_logger::LogEntry;

use crate::directory::{RawDirectoryBuffer, RawDirectoryReader};
use crate::path::ROOT;
use crate::{FsContext, FsError};

const COMPONENT: &str = "fs_view::file";

/// Opens `path` on the volume behind `handle`
pub fn open_by_handle(
    ctx: &FsContext<'_>,
    provider: &mut (impl VolumeProvider + ?Sized),
    handle: VolumeHandle,
    path: &str,
    mode: OpenMode,
) -> Result<FileGuard, FsError> {
    let mut fs = provider
        .handle_protocol(handle, &ctx.protocols.simple_file_system)
        .map_err(|source| {
            ctx.sink.log(
                LogEntry::error(COMPONENT, "unable to find simple file protocol")
                    .with_field("volume", handle)
                    .with_field("error", &source),
            );
            FsError::ProtocolUnavailable { handle, source }
        })?;

    let mut root = fs.open_volume().map(FileGuard::new).map_err(|source| {
        ctx.sink.log(
            LogEntry::error(COMPONENT, "failed to open drive volume")
                .with_field("volume", handle)
                .with_field("error", &source),
        );
        FsError::OpenFailed {
            path: ROOT.to_string(),
            source,
        }
    })?;

    root.open(path, mode)
        .map(FileGuard::new)
        .map_err(|source| FsError::OpenFailed {
            path: path.to_string(),
            source,
        })
}

/// Reads every record of the directory at `path`
pub fn read_dir_all(
    ctx: &FsContext<'_>,
    provider: &mut (impl VolumeProvider + ?Sized),
    handle: VolumeHandle,
    path: &str,
) -> Result<RawDirectoryBuffer, FsError> {
    let dir = open_by_handle(ctx, provider, handle, path, OpenMode::Read).inspect_err(|err| {
        ctx.sink.log(
            LogEntry::error(COMPONENT, "failed to open directory")
                .with_field("path", path)
                .with_field("error", err),
        );
    })?;
    RawDirectoryReader::new(ctx).read_all(dir, path)
}

/// Contents of a whole file
///
/// The buffer is zero filled and rounded up to whole pages; only the first
/// [`FileContents::len`] bytes were read from the file.
#[derive(Debug)]
pub struct FileContents {
    buffer: Pooled<Vec<u8>>,
    len: usize,
}

impl FileContents {
    /// Bytes read from the file
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the page-aligned buffer
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

/// Reads the whole of `file`, sized by its info record
pub fn read_file_all(
    ctx: &FsContext<'_>,
    file: &mut FileGuard,
    name: &str,
) -> Result<FileContents, FsError> {
    let info = file.file_info(&ctx.protocols.file_info).map_err(|source| {
        ctx.sink.log(
            LogEntry::error(COMPONENT, "failed to get file info")
                .with_field("path", name)
                .with_field("error", &source),
        );
        FsError::InfoFailed {
            path: name.to_string(),
            source,
        }
    })?;

    let size = usize::try_from(info.file_size).map_err(|_| MemoryError::OutOfResources {
        requested: usize::MAX,
    })?;
    let mut buffer = ctx
        .pool
        .allocate_zeroed(align_to_page(size))
        .map_err(|err| {
            ctx.sink.log(
                LogEntry::error(COMPONENT, "failed to allocate file buffer")
                    .with_field("path", name)
                    .with_field("bytes", size),
            );
            FsError::from(err)
        })?;

    let len = file
        .read(&mut buffer[..size])
        .map_err(|source| FsError::Read {
            path: name.to_string(),
            source,
        })?;

    Ok(FileContents { buffer, len })
}
