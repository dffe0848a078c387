//! # Firmware Abstraction Layer
//!
//! This crate defines the firmware services the navigator consumes.
//!
//! ## Philosophy
//!
//! **Firmware must be fully abstracted and swappable.**
//!
//! The navigator never talks to a concrete firmware. Volumes, files and the
//! text menu are traits; simulated implementations back the tests and host
//! directories back the host daemon.
//!
//! ## Design Principles
//!
//! 1. **Trait-based**: every firmware call goes through a trait
//! 2. **Scoped handles**: open handles are closed by [`FileGuard`]
//! 3. **Wire format is explicit**: directory records are byte-exact
//! 4. **Testable**: every trait can be mocked

pub mod console;
pub mod file;
pub mod file_info;
pub mod volume;

pub use console::{ConsoleSelect, PresentedMenu, ScriptedSelect};
pub use file::{FileError, FileGuard, FileProtocol, OpenMode};
pub use file_info::{
    record_attribute, record_len_for, record_name_units, read_unit, EfiTime, FileAttribute,
    FileInfo, FileSystemInfo, RecordError, FILE_NAME_OFFSET,
};
pub use volume::{SimpleFileSystem, VolumeHandle, VolumeProvider};
