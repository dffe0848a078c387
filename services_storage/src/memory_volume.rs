//! # Memory Volumes
//!
//! In-memory volumes implementing the firmware file protocol.
//!
//! Directory reads return one encoded record per call in insertion order.
//! Subdirectories list synthetic `.` and `..` records first, the way FAT
//! volumes do; the root lists neither.

use core_types::{Guid, ProtocolIds};
use hal::{
    FileError, FileInfo, FileProtocol, FileSystemInfo, OpenMode, SimpleFileSystem, VolumeHandle,
    VolumeProvider,
};
use std::cell::Cell;
use std::rc::Rc;

/// A node of an in-memory volume tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNode {
    /// Directory with entries in listing order
    Directory(Vec<(String, MemoryNode)>),
    /// Regular file contents
    File(Vec<u8>),
}

impl MemoryNode {
    fn child(&self, name: &str) -> Option<&MemoryNode> {
        match self {
            MemoryNode::Directory(entries) => entries
                .iter()
                .find(|(entry, _)| entry == name)
                .map(|(_, node)| node),
            MemoryNode::File(_) => None,
        }
    }

    fn is_directory(&self) -> bool {
        matches!(self, MemoryNode::Directory(_))
    }
}

/// Handle and call counters shared by all handles of a volume set
#[derive(Debug, Default)]
struct CallAccounting {
    opens: Cell<usize>,
    closes: Cell<usize>,
    reads: Cell<usize>,
}

/// Snapshot of handle accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallStats {
    /// Handles opened (volume roots included)
    pub opens: usize,
    /// Handles closed
    pub closes: usize,
    /// Read calls
    pub reads: usize,
}

impl CallStats {
    /// Handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.opens - self.closes
    }
}

/// One in-memory volume
#[derive(Debug, Clone)]
pub struct MemoryVolume {
    label: String,
    device_path: Option<String>,
    read_only: bool,
    root_dots: bool,
    root: Rc<MemoryNode>,
}

impl MemoryVolume {
    /// Creates an empty volume with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            device_path: None,
            read_only: false,
            root_dots: false,
            root: Rc::new(MemoryNode::Directory(Vec::new())),
        }
    }

    /// Sets the textual device path
    pub fn with_device_path(mut self, path: impl Into<String>) -> Self {
        self.device_path = Some(path.into());
        self
    }

    /// Marks the volume read only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Lists `.` and `..` in the root directory as well
    pub fn with_root_dots(mut self) -> Self {
        self.root_dots = true;
        self
    }

    /// Adds a directory, creating missing parents
    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert(path, None);
        self
    }

    /// Adds a file, creating missing parent directories
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, Some(contents.into()));
        self
    }

    fn insert(&mut self, path: &str, contents: Option<Vec<u8>>) {
        let components: Vec<&str> = path.split('\\').filter(|c| !c.is_empty()).collect();
        let Some((leaf, parents)) = components.split_last() else {
            return;
        };

        let mut node = Rc::make_mut(&mut self.root);
        for parent in parents {
            let MemoryNode::Directory(entries) = node else {
                return;
            };
            let index = match entries.iter().position(|(name, _)| name == parent) {
                Some(index) => index,
                None => {
                    entries.push((parent.to_string(), MemoryNode::Directory(Vec::new())));
                    entries.len() - 1
                }
            };
            node = &mut entries[index].1;
        }

        if let MemoryNode::Directory(entries) = node {
            let new_node = match contents {
                Some(data) => MemoryNode::File(data),
                None => MemoryNode::Directory(Vec::new()),
            };
            match entries.iter_mut().find(|(name, _)| name == leaf) {
                Some((_, existing)) => *existing = new_node,
                None => entries.push((leaf.to_string(), new_node)),
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A set of in-memory volumes acting as the handle database
#[derive(Debug)]
pub struct MemoryVolumeSet {
    protocols: ProtocolIds,
    volumes: Vec<(VolumeHandle, MemoryVolume)>,
    accounting: Rc<CallAccounting>,
}

impl MemoryVolumeSet {
    /// First handle value handed out
    const HANDLE_BASE: u64 = 0x1000;

    pub fn new(protocols: ProtocolIds) -> Self {
        Self {
            protocols,
            volumes: Vec::new(),
            accounting: Rc::new(CallAccounting::default()),
        }
    }

    /// Mounts a volume and returns its handle
    pub fn mount(&mut self, volume: MemoryVolume) -> VolumeHandle {
        let handle = VolumeHandle::new(Self::HANDLE_BASE + self.volumes.len() as u64);
        self.volumes.push((handle, volume));
        handle
    }

    /// Builder-style [`MemoryVolumeSet::mount`]
    pub fn with_volume(mut self, volume: MemoryVolume) -> Self {
        self.mount(volume);
        self
    }

    /// Handles of the mounted volumes in mount order
    pub fn handles(&self) -> Vec<VolumeHandle> {
        self.volumes.iter().map(|(handle, _)| *handle).collect()
    }

    /// Returns the current handle accounting
    pub fn stats(&self) -> CallStats {
        CallStats {
            opens: self.accounting.opens.get(),
            closes: self.accounting.closes.get(),
            reads: self.accounting.reads.get(),
        }
    }

    fn volume(&self, handle: VolumeHandle) -> Option<&MemoryVolume> {
        self.volumes
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, volume)| volume)
    }
}

impl VolumeProvider for MemoryVolumeSet {
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
        Ok(Box::new(MemoryFileSystem {
            volume: volume.clone(),
            protocols: self.protocols,
            accounting: Rc::clone(&self.accounting),
        }))
    }

    fn device_path_text(&self, handle: VolumeHandle) -> Option<String> {
        let index = self.volumes.iter().position(|(h, _)| *h == handle)?;
        let volume = &self.volumes[index].1;
        Some(
            volume
                .device_path
                .clone()
                .unwrap_or_else(|| format!("VenHw(Memory)/HD({},MBR)", index + 1)),
        )
    }
}

/// Simple file system interface of one memory volume
struct MemoryFileSystem {
    volume: MemoryVolume,
    protocols: ProtocolIds,
    accounting: Rc<CallAccounting>,
}

impl SimpleFileSystem for MemoryFileSystem {
    fn open_volume(&mut self) -> Result<Box<dyn FileProtocol>, FileError> {
        self.accounting.opens.set(self.accounting.opens.get() + 1);
        Ok(Box::new(MemoryFile {
            volume: self.volume.clone(),
            path: Vec::new(),
            position: 0,
            protocols: self.protocols,
            accounting: Rc::clone(&self.accounting),
        }))
    }
}

/// An open handle on a memory volume
struct MemoryFile {
    volume: MemoryVolume,
    /// Components from the root
    path: Vec<String>,
    /// Byte offset for files, record index for directories
    position: u64,
    protocols: ProtocolIds,
    accounting: Rc<CallAccounting>,
}

impl MemoryFile {
    fn node(&self) -> Result<&MemoryNode, FileError> {
        let mut node = self.volume.root.as_ref();
        for component in &self.path {
            node = node
                .child(component)
                .ok_or_else(|| FileError::NotFound(component.clone()))?;
        }
        Ok(node)
    }

    fn listing(&self) -> Result<Vec<FileInfo>, FileError> {
        let MemoryNode::Directory(entries) = self.node()? else {
            return Err(FileError::InvalidParameter);
        };
        let mut records = Vec::with_capacity(entries.len() + 2);
        if !self.path.is_empty() || self.volume.root_dots {
            records.push(FileInfo::directory("."));
            records.push(FileInfo::directory(".."));
        }
        for (name, node) in entries {
            records.push(match node {
                MemoryNode::Directory(_) => FileInfo::directory(name.clone()),
                MemoryNode::File(data) => FileInfo::file(name.clone(), data.len() as u64),
            });
        }
        Ok(records)
    }
}

impl FileProtocol for MemoryFile {
    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Box<dyn FileProtocol>, FileError> {
        if mode != OpenMode::Read && self.volume.read_only {
            return Err(FileError::WriteProtected);
        }

        let mut path = if name.starts_with('\\') {
            Vec::new()
        } else {
            self.path.clone()
        };
        for component in name.split('\\').filter(|c| !c.is_empty()) {
            match component {
                "." => {}
                ".." => {
                    path.pop();
                }
                other => path.push(other.to_string()),
            }
        }

        let opened = MemoryFile {
            volume: self.volume.clone(),
            path,
            position: 0,
            protocols: self.protocols,
            accounting: Rc::clone(&self.accounting),
        };
        opened
            .node()
            .map_err(|_| FileError::NotFound(name.to_string()))?;

        self.accounting.opens.set(self.accounting.opens.get() + 1);
        Ok(Box::new(opened))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, FileError> {
        self.accounting.reads.set(self.accounting.reads.get() + 1);

        if self.node()?.is_directory() {
            let records = self.listing()?;
            let Some(record) = records.get(self.position as usize) else {
                return Ok(0);
            };
            let written = record
                .encode_into(buffer)
                .map_err(|required| FileError::BufferTooSmall { required })?;
            self.position += 1;
            return Ok(written);
        }

        let MemoryNode::File(data) = self.node()? else {
            return Err(FileError::DeviceError);
        };
        let start = (self.position as usize).min(data.len());
        let count = buffer.len().min(data.len() - start);
        buffer[..count].copy_from_slice(&data[start..start + count]);
        self.position += count as u64;
        Ok(count)
    }

    fn set_position(&mut self, position: u64) -> Result<(), FileError> {
        if self.node()?.is_directory() && position != 0 {
            return Err(FileError::Unsupported);
        }
        self.position = position;
        Ok(())
    }

    fn file_info(&mut self, info_type: &Guid) -> Result<FileInfo, FileError> {
        if *info_type != self.protocols.file_info {
            return Err(FileError::Unsupported);
        }
        let name = self.path.last().cloned().unwrap_or_else(|| "\\".to_string());
        Ok(match self.node()? {
            MemoryNode::Directory(_) => FileInfo::directory(name),
            MemoryNode::File(data) => FileInfo::file(name, data.len() as u64),
        })
    }

    fn file_system_info(&mut self, info_type: &Guid) -> Result<FileSystemInfo, FileError> {
        if *info_type != self.protocols.file_system_info {
            return Err(FileError::Unsupported);
        }
        Ok(FileSystemInfo {
            read_only: self.volume.read_only,
            block_size: 512,
            ..FileSystemInfo::labeled(self.volume.label.clone())
        })
    }

    fn close(&mut self) {
        self.accounting.closes.set(self.accounting.closes.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::FileGuard;

    fn test_set() -> (MemoryVolumeSet, VolumeHandle) {
        let mut set = MemoryVolumeSet::new(ProtocolIds::standard());
        let handle = set.mount(
            MemoryVolume::new("ESP")
                .with_file("\\EFI\\BOOT\\BOOTX64.EFI", b"MZ".to_vec())
                .with_file("\\readme.txt", b"hello".to_vec()),
        );
        (set, handle)
    }

    fn open_root(set: &mut MemoryVolumeSet, handle: VolumeHandle) -> FileGuard {
        let ids = ProtocolIds::standard();
        let mut fs = set.handle_protocol(handle, &ids.simple_file_system).unwrap();
        FileGuard::new(fs.open_volume().unwrap())
    }

    fn read_names(file: &mut FileGuard) -> Vec<String> {
        let mut names = Vec::new();
        let mut buffer = [0u8; 512];
        loop {
            let len = file.read(&mut buffer).unwrap();
            if len == 0 {
                break;
            }
            names.push(FileInfo::decode(&buffer[..len]).unwrap().file_name);
        }
        names
    }

    #[test]
    fn test_locate_handles() {
        let (set, handle) = test_set();
        let ids = ProtocolIds::standard();
        assert_eq!(set.locate_handles(&ids.simple_file_system), vec![handle]);
        assert!(set.locate_handles(&ids.loaded_image).is_empty());
    }

    #[test]
    fn test_handle_protocol_wrong_guid() {
        let (mut set, handle) = test_set();
        let ids = ProtocolIds::standard();
        assert!(matches!(
            set.handle_protocol(handle, &ids.loaded_image),
            Err(FileError::Unsupported)
        ));
    }

    #[test]
    fn test_root_listing_has_no_dot_entries() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        assert_eq!(read_names(&mut root), vec!["EFI", "readme.txt"]);
    }

    #[test]
    fn test_subdirectory_listing_has_dot_entries() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        let mut boot = FileGuard::new(root.open("\\EFI\\BOOT", OpenMode::Read).unwrap());
        assert_eq!(read_names(&mut boot), vec![".", "..", "BOOTX64.EFI"]);
    }

    #[test]
    fn test_rewind_directory() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        assert_eq!(read_names(&mut root).len(), 2);
        root.set_position(0).unwrap();
        assert_eq!(read_names(&mut root).len(), 2);
        assert_eq!(root.set_position(3), Err(FileError::Unsupported));
    }

    #[test]
    fn test_small_buffer_does_not_advance() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        let mut small = [0u8; 8];
        assert!(matches!(
            root.read(&mut small),
            Err(FileError::BufferTooSmall { .. })
        ));
        assert_eq!(read_names(&mut root), vec!["EFI", "readme.txt"]);
    }

    #[test]
    fn test_read_file_contents() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        let mut file = FileGuard::new(root.open("readme.txt", OpenMode::Read).unwrap());
        let mut buffer = [0u8; 3];
        assert_eq!(file.read(&mut buffer), Ok(3));
        assert_eq!(&buffer, b"hel");
        assert_eq!(file.read(&mut buffer), Ok(2));
        assert_eq!(file.read(&mut buffer), Ok(0));
    }

    #[test]
    fn test_open_relative_dot_dot() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        let mut efi = FileGuard::new(root.open("EFI\\BOOT\\..", OpenMode::Read).unwrap());
        let info = efi.file_info(&ProtocolIds::standard().file_info).unwrap();
        assert_eq!(info.file_name, "EFI");
        assert!(info.is_directory());
    }

    #[test]
    fn test_open_missing() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        assert!(matches!(
            root.open("\\nope", OpenMode::Read),
            Err(FileError::NotFound(_))
        ));
    }

    #[test]
    fn test_read_only_volume_rejects_write_mode() {
        let mut set = MemoryVolumeSet::new(ProtocolIds::standard());
        let handle = set.mount(MemoryVolume::new("RO").with_file("a", b"x".to_vec()).read_only());
        let mut root = open_root(&mut set, handle);
        assert!(matches!(
            root.open("a", OpenMode::ReadWrite),
            Err(FileError::WriteProtected)
        ));
    }

    #[test]
    fn test_file_system_info_label() {
        let (mut set, handle) = test_set();
        let mut root = open_root(&mut set, handle);
        let info = root
            .file_system_info(&ProtocolIds::standard().file_system_info)
            .unwrap();
        assert_eq!(info.volume_label, "ESP");
    }

    #[test]
    fn test_device_path_fallback() {
        let (set, handle) = test_set();
        assert_eq!(
            set.device_path_text(handle).as_deref(),
            Some("VenHw(Memory)/HD(1,MBR)")
        );
        assert_eq!(set.device_path_text(VolumeHandle::new(1)), None);
    }

    #[test]
    fn test_accounting_balances() {
        let (mut set, handle) = test_set();
        {
            let mut root = open_root(&mut set, handle);
            let _efi = FileGuard::new(root.open("EFI", OpenMode::Read).unwrap());
            assert_eq!(set.stats().open_handles(), 2);
        }
        let stats = set.stats();
        assert_eq!(stats.opens, 2);
        assert_eq!(stats.open_handles(), 0);
    }
}
