//! Volume discovery
//!
//! A [`VolumeProvider`] stands in for the boot services handle database:
//! it locates handles carrying a protocol and hands out the simple file
//! system interface of a handle.

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core_types::Guid;

use crate::file::{FileError, FileProtocol};

/// Opaque handle naming a device that may expose a file system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeHandle(u64);

impl VolumeHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VolumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

/// Simple file system protocol of one volume
pub trait SimpleFileSystem {
    /// Opens the root directory of the volume
    fn open_volume(&mut self) -> Result<Box<dyn FileProtocol>, FileError>;
}

/// Handle database
pub trait VolumeProvider {
    /// Returns every handle that carries `protocol`, in firmware order
    fn locate_handles(&self, protocol: &Guid) -> Vec<VolumeHandle>;

    /// Returns the interface of `protocol` on `handle`
    ///
    /// Fails with [`FileError::Unsupported`] if the handle does not carry it.
    fn handle_protocol(
        &mut self,
        handle: VolumeHandle,
        protocol: &Guid,
    ) -> Result<Box<dyn SimpleFileSystem>, FileError>;

    /// Textual device path of `handle`
    fn device_path_text(&self, handle: VolumeHandle) -> Option<String>;
}

impl<V: VolumeProvider + ?Sized> VolumeProvider for &mut V {
    fn locate_handles(&self, protocol: &Guid) -> Vec<VolumeHandle> {
        (**self).locate_handles(protocol)
    }

    fn handle_protocol(
        &mut self,
        handle: VolumeHandle,
        protocol: &Guid,
    ) -> Result<Box<dyn SimpleFileSystem>, FileError> {
        (**self).handle_protocol(handle, protocol)
    }

    fn device_path_text(&self, handle: VolumeHandle) -> Option<String> {
        (**self).device_path_text(handle)
    }
}
