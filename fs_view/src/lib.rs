//! # Filesystem View
//!
//! This crate turns a firmware volume into something a person can navigate.
//!
//! ## Philosophy
//!
//! - **Read once, view many**: a directory is read into one raw buffer and
//!   every listing entry is an offset view into it
//! - **Two passes, exact sizes**: readers measure before they allocate
//! - **Handles are scoped**: every handle opened here is closed before the
//!   call that opened it returns, success or failure
//!
//! ## Design
//!
//! - [`RawDirectoryReader`] reads a directory into a [`RawDirectoryBuffer`]
//! - [`FilterSet`] parses `|`-separated suffix filters
//! - [`EntryTransformer`] builds a [`DisplayList`] from a raw buffer
//! - [`PathState`] is the current path of a navigation session
//! - [`open_by_handle`], [`read_dir_all`] and [`read_file_all`] wrap the
//!   volume → root → path sequence

pub mod directory;
pub mod error;
pub mod file;
pub mod filter;
pub mod listing;
pub mod path;

use core_types::{BootPool, ProtocolIds};
use services_logger::LogSink;

pub use directory::{Measurement, RawDirectoryBuffer, RawDirectoryReader, RawEntries, RawEntry};
pub use error::FsError;
pub use file::{open_by_handle, read_dir_all, read_file_all, FileContents};
pub use filter::FilterSet;
pub use listing::{DisplayEntry, DisplayList, EntryTransformer, CURRENT_DIR, PARENT_DIR};
pub use path::{PathState, ROOT, SEPARATOR};

/// Collaborators shared by every operation of one session
///
/// Built once by the caller and passed by reference.
#[derive(Clone, Copy)]
pub struct FsContext<'a> {
    pub pool: &'a BootPool,
    pub protocols: &'a ProtocolIds,
    pub sink: &'a dyn LogSink,
}

impl<'a> FsContext<'a> {
    pub fn new(pool: &'a BootPool, protocols: &'a ProtocolIds, sink: &'a dyn LogSink) -> Self {
        Self {
            pool,
            protocols,
            sink,
        }
    }
}
