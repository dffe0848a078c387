//! # Host Volumes
//!
//! Host directories exposed through the firmware volume traits, so the
//! picker can browse a real tree. Volumes are read only.
//!
//! Paths never leave the mounted directory: `..` at the volume root stays at
//! the root. Directory records are listed in name order, with `.` and `..`
//! first below the root.

use core_types::{Guid, ProtocolIds};
use hal::{
    FileAttribute, FileError, FileInfo, FileProtocol, FileSystemInfo, OpenMode, SimpleFileSystem,
    VolumeHandle, VolumeProvider,
};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config::VolumeConfig;

/// One host directory mounted as a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostVolume {
    root: PathBuf,
    label: String,
}

impl HostVolume {
    pub fn new(root: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            label: label.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl From<&VolumeConfig> for HostVolume {
    fn from(config: &VolumeConfig) -> Self {
        Self::new(config.root(), config.label.clone().unwrap_or_default())
    }
}

/// Handle database over mounted host directories
#[derive(Debug)]
pub struct HostVolumeSet {
    protocols: ProtocolIds,
    volumes: Vec<(VolumeHandle, HostVolume)>,
}

impl HostVolumeSet {
    const HANDLE_BASE: u64 = 0x2000;

    pub fn new(protocols: ProtocolIds) -> Self {
        Self {
            protocols,
            volumes: Vec::new(),
        }
    }

    /// Mounts every configured volume in order
    pub fn from_config(protocols: ProtocolIds, volumes: &[VolumeConfig]) -> Self {
        let mut set = Self::new(protocols);
        for volume in volumes {
            set.mount(HostVolume::from(volume));
        }
        set
    }

    pub fn mount(&mut self, volume: HostVolume) -> VolumeHandle {
        let handle = VolumeHandle::new(Self::HANDLE_BASE + self.volumes.len() as u64);
        self.volumes.push((handle, volume));
        handle
    }

    /// Handles of the mounted volumes in mount order
    pub fn handles(&self) -> Vec<VolumeHandle> {
        self.volumes.iter().map(|(handle, _)| *handle).collect()
    }

    pub fn volume(&self, handle: VolumeHandle) -> Option<&HostVolume> {
        self.volumes
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, volume)| volume)
    }

    /// Host path of a volume path such as `\EFI\BOOT\BOOTX64.EFI`
    pub fn host_path(&self, handle: VolumeHandle, path: &str) -> Option<PathBuf> {
        let volume = self.volume(handle)?;
        let components = resolve(&[], path).ok()?;
        Some(join(&volume.root, &components))
    }
}

impl VolumeProvider for HostVolumeSet {
    fn locate_handles(&self, protocol: &Guid) -> Vec<VolumeHandle> {
        if *protocol != self.protocols.simple_file_system {
            return Vec::new();
        }
        self.handles()
    }

    fn handle_protocol(
        &mut self,
        handle: VolumeHandle,
        protocol: &Guid,
    ) -> Result<Box<dyn SimpleFileSystem>, FileError> {
        if *protocol != self.protocols.simple_file_system {
            return Err(FileError::Unsupported);
        }
        let volume = self.volume(handle).ok_or(FileError::InvalidParameter)?;
        Ok(Box::new(HostFileSystem {
            volume: volume.clone(),
            protocols: self.protocols,
        }))
    }

    fn device_path_text(&self, handle: VolumeHandle) -> Option<String> {
        self.volume(handle)
            .map(|volume| format!("HostPath({})", volume.root.display()))
    }
}

struct HostFileSystem {
    volume: HostVolume,
    protocols: ProtocolIds,
}

impl SimpleFileSystem for HostFileSystem {
    fn open_volume(&mut self) -> Result<Box<dyn FileProtocol>, FileError> {
        let metadata = fs::metadata(&self.volume.root).map_err(|e| map_io(e, "\\"))?;
        if !metadata.is_dir() {
            return Err(FileError::DeviceError);
        }
        Ok(Box::new(HostFile::new(
            self.volume.clone(),
            Vec::new(),
            self.protocols,
        )))
    }
}

/// An open file or directory below a host volume
struct HostFile {
    volume: HostVolume,
    components: Vec<String>,
    /// Byte offset for files, record index for directories
    position: u64,
    /// Directory records, read on first use and kept until close
    listing: Option<Vec<FileInfo>>,
    protocols: ProtocolIds,
}

impl HostFile {
    fn new(volume: HostVolume, components: Vec<String>, protocols: ProtocolIds) -> Self {
        Self {
            volume,
            components,
            position: 0,
            listing: None,
            protocols,
        }
    }

    fn host_path(&self) -> PathBuf {
        join(&self.volume.root, &self.components)
    }

    fn display_name(&self) -> String {
        format!("\\{}", self.components.join("\\"))
    }

    fn metadata(&self) -> Result<fs::Metadata, FileError> {
        fs::metadata(self.host_path()).map_err(|e| map_io(e, &self.display_name()))
    }

    fn read_listing(&self) -> Result<Vec<FileInfo>, FileError> {
        let name = self.display_name();
        let mut records = Vec::new();
        for entry in fs::read_dir(self.host_path()).map_err(|e| map_io(e, &name))? {
            let entry = entry.map_err(|e| map_io(e, &name))?;
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            let metadata = entry.metadata().map_err(|e| map_io(e, &name))?;
            records.push(record_for(file_name, &metadata));
        }
        records.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        if !self.components.is_empty() {
            records.insert(0, FileInfo::directory("."));
            records.insert(1, FileInfo::directory(".."));
        }
        Ok(records)
    }

    fn read_directory(&mut self, buffer: &mut [u8]) -> Result<usize, FileError> {
        if self.listing.is_none() {
            self.listing = Some(self.read_listing()?);
        }
        let Some(record) = self
            .listing
            .as_ref()
            .and_then(|records| records.get(self.position as usize))
        else {
            return Ok(0);
        };
        let written = record
            .encode_into(buffer)
            .map_err(|required| FileError::BufferTooSmall { required })?;
        self.position += 1;
        Ok(written)
    }

    fn read_file(&mut self, buffer: &mut [u8]) -> Result<usize, FileError> {
        let name = self.display_name();
        let mut file = fs::File::open(self.host_path()).map_err(|e| map_io(e, &name))?;
        file.seek(SeekFrom::Start(self.position))
            .map_err(|e| map_io(e, &name))?;

        let mut filled = 0;
        while filled < buffer.len() {
            match file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e, &name)),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }
}

impl FileProtocol for HostFile {
    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Box<dyn FileProtocol>, FileError> {
        if mode != OpenMode::Read {
            return Err(FileError::WriteProtected);
        }
        let components = resolve(&self.components, name)?;
        let opened = HostFile::new(self.volume.clone(), components, self.protocols);
        fs::metadata(opened.host_path()).map_err(|e| map_io(e, name))?;
        Ok(Box::new(opened))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, FileError> {
        if self.metadata()?.is_dir() {
            self.read_directory(buffer)
        } else {
            self.read_file(buffer)
        }
    }

    fn set_position(&mut self, position: u64) -> Result<(), FileError> {
        if self.metadata()?.is_dir() && position != 0 {
            return Err(FileError::Unsupported);
        }
        self.position = position;
        Ok(())
    }

    fn file_info(&mut self, info_type: &Guid) -> Result<FileInfo, FileError> {
        if *info_type != self.protocols.file_info {
            return Err(FileError::Unsupported);
        }
        let metadata = self.metadata()?;
        let name = self
            .components
            .last()
            .cloned()
            .unwrap_or_else(|| "\\".to_string());
        Ok(record_for(name, &metadata))
    }

    fn file_system_info(&mut self, info_type: &Guid) -> Result<FileSystemInfo, FileError> {
        if *info_type != self.protocols.file_system_info {
            return Err(FileError::Unsupported);
        }
        Ok(FileSystemInfo {
            read_only: true,
            block_size: 512,
            ..FileSystemInfo::labeled(self.volume.label.clone())
        })
    }

    fn close(&mut self) {
        self.listing = None;
    }
}

/// Resolves `name` against `base`, staying inside the volume
fn resolve(base: &[String], name: &str) -> Result<Vec<String>, FileError> {
    let mut components = if name.starts_with('\\') {
        Vec::new()
    } else {
        base.to_vec()
    };
    for component in name.split('\\').filter(|c| !c.is_empty()) {
        match component {
            "." => {}
            ".." => {
                components.pop();
            }
            other if other.contains('/') => return Err(FileError::InvalidParameter),
            other => components.push(other.to_string()),
        }
    }
    Ok(components)
}

fn join(root: &Path, components: &[String]) -> PathBuf {
    components
        .iter()
        .fold(root.to_path_buf(), |path, component| path.join(component))
}

fn record_for(name: String, metadata: &fs::Metadata) -> FileInfo {
    let mut attribute = if metadata.is_dir() {
        FileAttribute::DIRECTORY
    } else {
        FileAttribute::ARCHIVE
    };
    if metadata.permissions().readonly() {
        attribute = attribute.with(FileAttribute::READ_ONLY);
    }
    let size = if metadata.is_dir() { 0 } else { metadata.len() };
    FileInfo::new(name, attribute, size)
}

fn map_io(error: io::Error, name: &str) -> FileError {
    match error.kind() {
        io::ErrorKind::NotFound => FileError::NotFound(name.to_string()),
        io::ErrorKind::PermissionDenied => FileError::AccessDenied,
        _ => FileError::DeviceError,
    }
}
