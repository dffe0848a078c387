//! File information records
//!
//! Directory reads return one [`FileInfo`] record per call, encoded in the
//! firmware layout:
//!
//! ```text
//! offset  size  field
//!      0     8  size            (record length in bytes)
//!      8     8  file_size
//!     16     8  physical_size
//!     24    16  create_time
//!     40    16  last_access_time
//!     56    16  modification_time
//!     72     8  attribute
//!     80     *  file_name       (UTF-16LE, NUL terminated)
//! ```
//!
//! Records are packed back to back with no padding, so the offset of the next
//! record follows from the length of the current name.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use thiserror::Error;

/// Offset of the file name within an encoded record
pub const FILE_NAME_OFFSET: usize = 80;

const ATTRIBUTE_OFFSET: usize = 72;

/// Errors decoding an encoded record
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record truncated: {available} bytes available, {required} required")]
    Truncated { available: usize, required: usize },

    #[error("Record name is not NUL terminated")]
    Unterminated,

    #[error("Record name is not valid UTF-16")]
    InvalidName,
}

/// File attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileAttribute(u64);

impl FileAttribute {
    pub const READ_ONLY: Self = Self(0x01);
    pub const HIDDEN: Self = Self(0x02);
    pub const SYSTEM: Self = Self(0x04);
    pub const RESERVED: Self = Self(0x08);
    pub const DIRECTORY: Self = Self(0x10);
    pub const ARCHIVE: Self = Self(0x20);

    /// No attributes set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates attributes from raw bits
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true if every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of both attribute sets
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }
}

/// Firmware time stamp (16 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EfiTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
    pub time_zone: i16,
    pub daylight: u8,
}

impl EfiTime {
    /// Encoded size in bytes
    pub const SIZE: usize = 16;

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.year.to_le_bytes());
        out[2] = self.month;
        out[3] = self.day;
        out[4] = self.hour;
        out[5] = self.minute;
        out[6] = self.second;
        out[7] = 0;
        out[8..12].copy_from_slice(&self.nanosecond.to_le_bytes());
        out[12..14].copy_from_slice(&self.time_zone.to_le_bytes());
        out[14] = self.daylight;
        out[15] = 0;
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            year: u16::from_le_bytes([bytes[0], bytes[1]]),
            month: bytes[2],
            day: bytes[3],
            hour: bytes[4],
            minute: bytes[5],
            second: bytes[6],
            nanosecond: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            time_zone: i16::from_le_bytes([bytes[12], bytes[13]]),
            daylight: bytes[14],
        }
    }
}

/// Information about one file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub file_size: u64,
    pub physical_size: u64,
    pub create_time: EfiTime,
    pub last_access_time: EfiTime,
    pub modification_time: EfiTime,
    pub attribute: FileAttribute,
    pub file_name: String,
}

impl FileInfo {
    /// Creates a record with zeroed time stamps
    pub fn new(file_name: impl Into<String>, attribute: FileAttribute, file_size: u64) -> Self {
        Self {
            file_size,
            physical_size: file_size,
            create_time: EfiTime::default(),
            last_access_time: EfiTime::default(),
            modification_time: EfiTime::default(),
            attribute,
            file_name: file_name.into(),
        }
    }

    /// Creates a directory record
    pub fn directory(file_name: impl Into<String>) -> Self {
        Self::new(file_name, FileAttribute::DIRECTORY, 0)
    }

    /// Creates a regular file record
    pub fn file(file_name: impl Into<String>, file_size: u64) -> Self {
        Self::new(file_name, FileAttribute::ARCHIVE, file_size)
    }

    pub fn is_directory(&self) -> bool {
        self.attribute.is_directory()
    }

    /// Length of this record once encoded
    pub fn record_len(&self) -> usize {
        record_len_for(self.file_name.encode_utf16().count())
    }

    /// Encodes the record into a new vector
    pub fn encode(&self) -> Vec<u8> {
        let mut out = alloc::vec![0u8; self.record_len()];
        self.write_record(&mut out);
        out
    }

    /// Encodes the record into `out`, returning the bytes written
    ///
    /// Returns `Err(required)` if `out` cannot hold the record.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize, usize> {
        let len = self.record_len();
        if out.len() < len {
            return Err(len);
        }
        self.write_record(&mut out[..len]);
        Ok(len)
    }

    fn write_record(&self, out: &mut [u8]) {
        let len = out.len() as u64;
        out[0..8].copy_from_slice(&len.to_le_bytes());
        out[8..16].copy_from_slice(&self.file_size.to_le_bytes());
        out[16..24].copy_from_slice(&self.physical_size.to_le_bytes());
        self.create_time.encode(&mut out[24..40]);
        self.last_access_time.encode(&mut out[40..56]);
        self.modification_time.encode(&mut out[56..72]);
        out[ATTRIBUTE_OFFSET..FILE_NAME_OFFSET]
            .copy_from_slice(&self.attribute.bits().to_le_bytes());
        let mut pos = FILE_NAME_OFFSET;
        for unit in self.file_name.encode_utf16() {
            out[pos..pos + 2].copy_from_slice(&unit.to_le_bytes());
            pos += 2;
        }
        out[pos..pos + 2].copy_from_slice(&[0, 0]);
    }

    /// Decodes the record at the start of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let units = record_name_units(bytes)?;
        let name: Vec<u16> = (0..units)
            .map(|i| read_unit(bytes, FILE_NAME_OFFSET + i * 2))
            .collect();
        let file_name = String::from_utf16(&name).map_err(|_| RecordError::InvalidName)?;

        Ok(Self {
            file_size: read_u64(bytes, 8),
            physical_size: read_u64(bytes, 16),
            create_time: EfiTime::decode(&bytes[24..40]),
            last_access_time: EfiTime::decode(&bytes[40..56]),
            modification_time: EfiTime::decode(&bytes[56..72]),
            attribute: record_attribute(bytes)?,
            file_name,
        })
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_directory() {
            write!(f, "{}/", self.file_name)
        } else {
            write!(f, "{} ({} bytes)", self.file_name, self.file_size)
        }
    }
}

/// Encoded length of a record whose name has `name_units` UTF-16 units
pub const fn record_len_for(name_units: usize) -> usize {
    FILE_NAME_OFFSET + (name_units + 1) * 2
}

/// Counts the UTF-16 units of the record name, excluding the terminator
pub fn record_name_units(bytes: &[u8]) -> Result<usize, RecordError> {
    if bytes.len() < FILE_NAME_OFFSET + 2 {
        return Err(RecordError::Truncated {
            available: bytes.len(),
            required: FILE_NAME_OFFSET + 2,
        });
    }
    let mut units = 0;
    loop {
        let pos = FILE_NAME_OFFSET + units * 2;
        if pos + 2 > bytes.len() {
            return Err(RecordError::Unterminated);
        }
        if read_unit(bytes, pos) == 0 {
            return Ok(units);
        }
        units += 1;
    }
}

/// Reads the attribute field of the record at the start of `bytes`
pub fn record_attribute(bytes: &[u8]) -> Result<FileAttribute, RecordError> {
    if bytes.len() < FILE_NAME_OFFSET {
        return Err(RecordError::Truncated {
            available: bytes.len(),
            required: FILE_NAME_OFFSET,
        });
    }
    Ok(FileAttribute::from_bits(read_u64(bytes, ATTRIBUTE_OFFSET)))
}

/// Reads the UTF-16 unit at byte offset `pos`
pub fn read_unit(bytes: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
}

fn read_u64(bytes: &[u8], pos: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[pos..pos + 8]);
    u64::from_le_bytes(raw)
}

/// Information about a mounted volume
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileSystemInfo {
    pub read_only: bool,
    pub volume_size: u64,
    pub free_space: u64,
    pub block_size: u32,
    pub volume_label: String,
}

impl FileSystemInfo {
    /// Creates volume info carrying only a label
    pub fn labeled(volume_label: impl Into<String>) -> Self {
        Self {
            volume_label: volume_label.into(),
            ..Self::default()
        }
    }
}
