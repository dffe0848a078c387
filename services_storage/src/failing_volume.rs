//! # Failing Volumes
//!
//! A [`VolumeProvider`] wrapper that can simulate firmware failures for testing
//! partial enumeration and cleanup paths.

use core_types::Guid;
use hal::{
    FileError, FileInfo, FileProtocol, FileSystemInfo, OpenMode, SimpleFileSystem, VolumeHandle,
    VolumeProvider,
};
use std::cell::Cell;
use std::rc::Rc;

/// Policy for when failures should occur
#[derive(Debug, Clone)]
pub enum FailurePolicy {
    /// Never fail (passthrough)
    Never,
    /// Protocol lookup fails on these handles
    HandleProtocolOn(Vec<VolumeHandle>),
    /// Opening the volume root fails on these handles
    OpenVolumeOn(Vec<VolumeHandle>),
    /// Volume info queries fail on these handles
    FileSystemInfoOn(Vec<VolumeHandle>),
    /// File info queries fail on every handle
    FileInfo,
    /// Reads fail once N reads have succeeded
    AfterReads(usize),
    /// Rewinding a directory fails
    SetPosition,
}

#[derive(Debug)]
struct FaultState {
    policy: FailurePolicy,
    reads: Cell<usize>,
    injected: Cell<usize>,
}

impl FaultState {
    fn inject(&self) -> FileError {
        self.injected.set(self.injected.get() + 1);
        FileError::DeviceError
    }
}

/// Wrapper around a VolumeProvider that can simulate failures
pub struct FailingVolumeSet<P: VolumeProvider> {
    inner: P,
    state: Rc<FaultState>,
}

impl<P: VolumeProvider> FailingVolumeSet<P> {
    /// Create a new failing provider with the given policy
    pub fn new(inner: P, policy: FailurePolicy) -> Self {
        Self {
            inner,
            state: Rc::new(FaultState {
                policy,
                reads: Cell::new(0),
                injected: Cell::new(0),
            }),
        }
    }

    /// Get the underlying provider (for inspection)
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of failures injected so far
    pub fn injected_failures(&self) -> usize {
        self.state.injected.get()
    }
}

impl<P: VolumeProvider> VolumeProvider for FailingVolumeSet<P> {
    fn locate_handles(&self, protocol: &Guid) -> Vec<VolumeHandle> {
        self.inner.locate_handles(protocol)
    }

    fn handle_protocol(
        &mut self,
        handle: VolumeHandle,
        protocol: &Guid,
    ) -> Result<Box<dyn SimpleFileSystem>, FileError> {
        if let FailurePolicy::HandleProtocolOn(handles) = &self.state.policy {
            if handles.contains(&handle) {
                self.state.injected.set(self.state.injected.get() + 1);
                return Err(FileError::Unsupported);
            }
        }
        let inner = self.inner.handle_protocol(handle, protocol)?;
        Ok(Box::new(FailingFileSystem {
            inner,
            handle,
            state: Rc::clone(&self.state),
        }))
    }

    fn device_path_text(&self, handle: VolumeHandle) -> Option<String> {
        self.inner.device_path_text(handle)
    }
}

struct FailingFileSystem {
    inner: Box<dyn SimpleFileSystem>,
    handle: VolumeHandle,
    state: Rc<FaultState>,
}

impl SimpleFileSystem for FailingFileSystem {
    fn open_volume(&mut self) -> Result<Box<dyn FileProtocol>, FileError> {
        if let FailurePolicy::OpenVolumeOn(handles) = &self.state.policy {
            if handles.contains(&self.handle) {
                return Err(self.state.inject());
            }
        }
        let inner = self.inner.open_volume()?;
        Ok(Box::new(FailingFile {
            inner,
            handle: self.handle,
            state: Rc::clone(&self.state),
        }))
    }
}

struct FailingFile {
    inner: Box<dyn FileProtocol>,
    handle: VolumeHandle,
    state: Rc<FaultState>,
}

impl FileProtocol for FailingFile {
    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Box<dyn FileProtocol>, FileError> {
        let inner = self.inner.open(name, mode)?;
        Ok(Box::new(FailingFile {
            inner,
            handle: self.handle,
            state: Rc::clone(&self.state),
        }))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, FileError> {
        if let FailurePolicy::AfterReads(limit) = self.state.policy {
            if self.state.reads.get() >= limit {
                return Err(self.state.inject());
            }
        }
        let len = self.inner.read(buffer)?;
        self.state.reads.set(self.state.reads.get() + 1);
        Ok(len)
    }

    fn set_position(&mut self, position: u64) -> Result<(), FileError> {
        if matches!(self.state.policy, FailurePolicy::SetPosition) {
            return Err(self.state.inject());
        }
        self.inner.set_position(position)
    }

    fn file_info(&mut self, info_type: &Guid) -> Result<FileInfo, FileError> {
        if matches!(self.state.policy, FailurePolicy::FileInfo) {
            return Err(self.state.inject());
        }
        self.inner.file_info(info_type)
    }

    fn file_system_info(&mut self, info_type: &Guid) -> Result<FileSystemInfo, FileError> {
        if let FailurePolicy::FileSystemInfoOn(handles) = &self.state.policy {
            if handles.contains(&self.handle) {
                return Err(self.state.inject());
            }
        }
        self.inner.file_system_info(info_type)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
