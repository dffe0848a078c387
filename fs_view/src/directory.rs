//! Raw directory reading
//!
//! The file protocol returns one variable-length record per read and never
//! reports the directory size up front. [`RawDirectoryReader`] reads a whole
//! directory in two passes: `measure` reads every record into a scratch chunk
//! to learn the count and total length, then `materialize` rewinds and reads
//! the same records into one exactly-sized pool buffer.

use core_types::Pooled;
use hal::{
    read_unit, record_attribute, record_len_for, record_name_units, FileAttribute, FileGuard,
    FileInfo, RecordError, FILE_NAME_OFFSET,
};
use services_logger::LogEntry;

use crate::{FsContext, FsError};

/// Size of the scratch chunk used while measuring
pub const READ_CHUNK: usize = 4096;

const COMPONENT: &str = "fs_view::directory";

/// Every record of one directory, back to back
#[derive(Debug)]
pub struct RawDirectoryBuffer {
    bytes: Pooled<Vec<u8>>,
    count: usize,
}

impl RawDirectoryBuffer {
    /// Wraps `bytes` after checking that exactly `count` records fill it
    pub fn new(bytes: Pooled<Vec<u8>>, count: usize) -> Result<Self, FsError> {
        let mut offset = 0;
        for _ in 0..count {
            let units = record_name_units(&bytes[offset..])?;
            offset += record_len_for(units);
        }
        if offset != bytes.len() {
            return Err(FsError::Malformed(RecordError::Truncated {
                available: bytes.len(),
                required: offset,
            }));
        }
        Ok(Self { bytes, count })
    }

    /// Encodes `records` into a new pool buffer
    pub fn from_records(ctx: &FsContext<'_>, records: &[FileInfo]) -> Result<Self, FsError> {
        let total: usize = records.iter().map(FileInfo::record_len).sum();
        let mut bytes = ctx.pool.allocate_zeroed(total)?;
        let mut offset = 0;
        for record in records {
            let len = record.record_len();
            bytes[offset..offset + len].copy_from_slice(&record.encode());
            offset += len;
        }
        Self::new(bytes, records.len())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total encoded length in bytes
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Iterates the records in directory order
    pub fn entries(&self) -> RawEntries<'_> {
        RawEntries {
            bytes: &self.bytes,
            offset: 0,
            remaining: self.count,
        }
    }

    /// Returns the record starting at byte `offset`
    pub fn entry_at(&self, offset: usize) -> Option<RawEntry<'_>> {
        RawEntry::parse(self.bytes.get(offset..)?, offset)
    }
}

/// Iterator over the records of a [`RawDirectoryBuffer`]
pub struct RawEntries<'a> {
    bytes: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> Iterator for RawEntries<'a> {
    type Item = RawEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entry = RawEntry::parse(self.bytes.get(self.offset..)?, self.offset)?;
        self.offset += entry.record_len();
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// One record viewed in place
#[derive(Debug, Clone, Copy)]
pub struct RawEntry<'a> {
    offset: usize,
    record: &'a [u8],
    name_units: usize,
}

impl<'a> RawEntry<'a> {
    fn parse(bytes: &'a [u8], offset: usize) -> Option<Self> {
        let name_units = record_name_units(bytes).ok()?;
        let record = bytes.get(..record_len_for(name_units))?;
        Some(Self {
            offset,
            record,
            name_units,
        })
    }

    /// Byte offset of this record in its buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the name in UTF-16 units
    pub fn name_units(&self) -> usize {
        self.name_units
    }

    /// Encoded record length, derived from the name length
    pub fn record_len(&self) -> usize {
        record_len_for(self.name_units)
    }

    pub fn attribute(&self) -> FileAttribute {
        record_attribute(self.record).unwrap_or_default()
    }

    pub fn is_directory(&self) -> bool {
        self.attribute().is_directory()
    }

    /// The name as UTF-16 units
    pub fn name_utf16(&self) -> impl Iterator<Item = u16> + 'a {
        let record = self.record;
        (0..self.name_units).map(move |i| read_unit(record, FILE_NAME_OFFSET + i * 2))
    }

    /// The name, with unpaired surrogates replaced
    pub fn name(&self) -> String {
        let units: Vec<u16> = self.name_utf16().collect();
        String::from_utf16_lossy(&units)
    }

    /// Compares the name against `text` unit by unit
    pub fn name_is(&self, text: &str) -> bool {
        self.name_utf16().eq(text.encode_utf16())
    }

    /// Returns true if the name ends with `suffix`
    ///
    /// A suffix longer than the name never matches.
    pub fn name_ends_with(&self, suffix: &[u16]) -> bool {
        if suffix.len() > self.name_units {
            return false;
        }
        let start = self.name_units - suffix.len();
        suffix
            .iter()
            .enumerate()
            .all(|(i, unit)| read_unit(self.record, FILE_NAME_OFFSET + (start + i) * 2) == *unit)
    }

    /// Decodes the full record
    pub fn info(&self) -> Result<FileInfo, RecordError> {
        FileInfo::decode(self.record)
    }
}

/// Result of the first pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Records in the directory
    pub count: usize,
    /// Sum of the record lengths
    pub total_len: usize,
}

/// Reads an open directory into a [`RawDirectoryBuffer`]
pub struct RawDirectoryReader<'a> {
    ctx: &'a FsContext<'a>,
}

impl<'a> RawDirectoryReader<'a> {
    pub fn new(ctx: &'a FsContext<'a>) -> Self {
        Self { ctx }
    }

    /// Reads every record of `dir`
    ///
    /// `dir` is closed before this returns, whatever the outcome.
    pub fn read_all(&self, mut dir: FileGuard, name: &str) -> Result<RawDirectoryBuffer, FsError> {
        self.ensure_directory(&mut dir, name)?;
        let measurement = self.measure(&mut dir, name)?;
        dir.set_position(0).map_err(|source| {
            self.ctx.sink.log(
                LogEntry::error(COMPONENT, "failed to rewind directory")
                    .with_field("path", name)
                    .with_field("error", &source),
            );
            FsError::Read {
                path: name.to_string(),
                source,
            }
        })?;
        self.materialize(&mut dir, name, measurement)
    }

    fn ensure_directory(&self, dir: &mut FileGuard, name: &str) -> Result<(), FsError> {
        let info = dir.file_info(&self.ctx.protocols.file_info).map_err(|source| {
            self.ctx.sink.log(
                LogEntry::error(COMPONENT, "failed to get file info")
                    .with_field("path", name)
                    .with_field("error", &source),
            );
            FsError::InfoFailed {
                path: name.to_string(),
                source,
            }
        })?;
        if !info.is_directory() {
            self.ctx.sink.log(LogEntry::warn(COMPONENT, "not a directory").with_field("path", name));
            return Err(FsError::NotADirectory(name.to_string()));
        }
        Ok(())
    }

    /// First pass: counts records and sums their lengths
    pub fn measure(&self, dir: &mut FileGuard, name: &str) -> Result<Measurement, FsError> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut measurement = Measurement {
            count: 0,
            total_len: 0,
        };
        loop {
            let len = dir.read(&mut chunk).map_err(|source| FsError::Read {
                path: name.to_string(),
                source,
            })?;
            if len == 0 {
                break;
            }
            measurement.count += 1;
            measurement.total_len += len;
        }
        self.ctx.sink.log(
            LogEntry::debug(COMPONENT, "measured directory")
                .with_field("path", name)
                .with_field("count", measurement.count)
                .with_field("bytes", measurement.total_len),
        );
        Ok(measurement)
    }

    /// Second pass: reads `measurement.count` records into one pool buffer
    pub fn materialize(
        &self,
        dir: &mut FileGuard,
        name: &str,
        measurement: Measurement,
    ) -> Result<RawDirectoryBuffer, FsError> {
        let mut bytes = self
            .ctx
            .pool
            .allocate_zeroed(measurement.total_len)
            .map_err(|err| {
                self.ctx.sink.log(
                    LogEntry::error(COMPONENT, "failed to allocate directory buffer")
                        .with_field("path", name)
                        .with_field("bytes", measurement.total_len),
                );
                FsError::from(err)
            })?;

        let mut filled = 0;
        for _ in 0..measurement.count {
            let len = dir
                .read(&mut bytes[filled..])
                .map_err(|source| FsError::Read {
                    path: name.to_string(),
                    source,
                })?;
            if len == 0 {
                break;
            }
            filled += len;
        }
        if filled != measurement.total_len {
            return Err(FsError::ShortRead {
                path: name.to_string(),
                expected: measurement.total_len,
                found: filled,
            });
        }

        RawDirectoryBuffer::new(bytes, measurement.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{BootPool, ProtocolIds};
    use hal::{OpenMode, VolumeProvider};
    use services_logger::{LogLevel, MemorySink};
    use services_storage::{FailingVolumeSet, FailurePolicy, MemoryVolume, MemoryVolumeSet};

    fn volume_set() -> (MemoryVolumeSet, hal::VolumeHandle) {
        let mut set = MemoryVolumeSet::new(ProtocolIds::standard());
        let handle = set.mount(
            MemoryVolume::new("ESP")
                .with_file("\\EFI\\BOOT\\BOOTX64.EFI", b"MZ".to_vec())
                .with_file("\\EFI\\BOOT\\grub.cfg", b"set".to_vec())
                .with_dir("\\EFI\\empty")
                .with_file("\\readme.txt", b"hello".to_vec()),
        );
        (set, handle)
    }

    fn open(provider: &mut impl VolumeProvider, handle: hal::VolumeHandle, path: &str) -> FileGuard {
        let ids = ProtocolIds::standard();
        let mut fs = provider.handle_protocol(handle, &ids.simple_file_system).unwrap();
        let mut root = FileGuard::new(fs.open_volume().unwrap());
        FileGuard::new(root.open(path, OpenMode::Read).unwrap())
    }

    #[test]
    fn test_read_all_collects_every_record() {
        let (mut set, handle) = volume_set();
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut set, handle, "\\EFI\\BOOT");
        let buffer = RawDirectoryReader::new(&ctx).read_all(dir, "\\EFI\\BOOT").unwrap();

        let names: Vec<String> = buffer.entries().map(|e| e.name()).collect();
        assert_eq!(names, vec![".", "..", "BOOTX64.EFI", "grub.cfg"]);
        assert_eq!(buffer.len(), 4);
        assert_eq!(set.stats().open_handles(), 0);
    }

    #[test]
    fn test_walk_consumes_exact_length() {
        let (mut set, handle) = volume_set();
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut set, handle, "\\");
        let buffer = RawDirectoryReader::new(&ctx).read_all(dir, "\\").unwrap();

        let mut visited = 0;
        let mut consumed = 0;
        for entry in buffer.entries() {
            assert_eq!(entry.offset(), consumed);
            consumed += entry.record_len();
            visited += 1;
        }
        assert_eq!(visited, buffer.len());
        assert_eq!(consumed, buffer.byte_len());
    }

    #[test]
    fn test_not_a_directory() {
        let (mut set, handle) = volume_set();
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let file = open(&mut set, handle, "\\readme.txt");
        let err = RawDirectoryReader::new(&ctx)
            .read_all(file, "\\readme.txt")
            .unwrap_err();

        assert_eq!(err, FsError::NotADirectory("\\readme.txt".to_string()));
        assert_eq!(set.stats().open_handles(), 0);
        assert_eq!(sink.at_least(LogLevel::Warn).len(), 1);
        assert!(pool.stats().is_balanced());
    }

    #[test]
    fn test_empty_directory() {
        let mut set = MemoryVolumeSet::new(ProtocolIds::standard());
        let handle = set.mount(MemoryVolume::new("EMPTY"));
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut set, handle, "\\");
        let buffer = RawDirectoryReader::new(&ctx).read_all(dir, "\\").unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.byte_len(), 0);
    }

    #[test]
    fn test_allocation_failure_closes_handle() {
        let (mut set, handle) = volume_set();
        let pool = BootPool::failing_after(0);
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut set, handle, "\\EFI");
        let err = RawDirectoryReader::new(&ctx).read_all(dir, "\\EFI").unwrap_err();

        assert!(matches!(err, FsError::OutOfResources(_)));
        assert_eq!(set.stats().open_handles(), 0);
    }

    #[test]
    fn test_read_failure_in_second_pass_releases_buffer() {
        let (set, handle) = volume_set();
        // Root has two records: two reads plus the end marker in the first pass.
        let mut failing = FailingVolumeSet::new(set, FailurePolicy::AfterReads(3));
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut failing, handle, "\\");
        let err = RawDirectoryReader::new(&ctx).read_all(dir, "\\").unwrap_err();

        assert!(matches!(err, FsError::Read { .. }));
        assert!(pool.stats().is_balanced());
        assert_eq!(pool.stats().allocations, 1);
        assert_eq!(failing.inner().stats().open_handles(), 0);
    }

    #[test]
    fn test_rewind_failure() {
        let (set, handle) = volume_set();
        let mut failing = FailingVolumeSet::new(set, FailurePolicy::SetPosition);
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut failing, handle, "\\");
        let err = RawDirectoryReader::new(&ctx).read_all(dir, "\\").unwrap_err();
        assert!(matches!(err, FsError::Read { .. }));
        assert_eq!(pool.stats().allocations, 0);
    }

    #[test]
    fn test_info_failure() {
        let (set, handle) = volume_set();
        let mut failing = FailingVolumeSet::new(set, FailurePolicy::FileInfo);
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);

        let dir = open(&mut failing, handle, "\\");
        let err = RawDirectoryReader::new(&ctx).read_all(dir, "\\").unwrap_err();
        assert!(matches!(err, FsError::InfoFailed { .. }));
        assert_eq!(failing.inner().stats().open_handles(), 0);
    }

    #[test]
    fn test_buffer_rejects_count_mismatch() {
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);
        let buffer = RawDirectoryBuffer::from_records(
            &ctx,
            &[FileInfo::file("a", 1), FileInfo::file("b", 1)],
        )
        .unwrap();

        let mut copy = pool.allocate_zeroed(buffer.byte_len()).unwrap();
        copy.copy_from_slice(buffer.as_bytes());
        assert!(RawDirectoryBuffer::new(copy, 1).is_err());
    }

    #[test]
    fn test_entry_name_helpers() {
        let pool = BootPool::new();
        let sink = MemorySink::new();
        let ids = ProtocolIds::standard();
        let ctx = FsContext::new(&pool, &ids, &sink);
        let buffer = RawDirectoryBuffer::from_records(
            &ctx,
            &[FileInfo::directory("SUB"), FileInfo::file("b.EFI", 4)],
        )
        .unwrap();

        let entries: Vec<RawEntry<'_>> = buffer.entries().collect();
        assert!(entries[0].is_directory());
        assert!(entries[0].name_is("SUB"));
        assert!(!entries[1].is_directory());
        let suffix: Vec<u16> = ".EFI".encode_utf16().collect();
        assert!(entries[1].name_ends_with(&suffix));
        let too_long: Vec<u16> = "xxb.EFI".encode_utf16().collect();
        assert!(!entries[1].name_ends_with(&too_long));
        assert_eq!(entries[1].info().unwrap().file_size, 4);
        assert_eq!(
            buffer.entry_at(entries[1].offset()).map(|e| e.name()),
            Some("b.EFI".to_string())
        );
    }
}
