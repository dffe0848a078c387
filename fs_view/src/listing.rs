//! Display listings
//!
//! [`EntryTransformer`] turns a [`RawDirectoryBuffer`] into a [`DisplayList`]:
//! the names a user picks from. Entries do not copy names; they hold offsets
//! into the raw buffer, which the list borrows, so a list can never outlive
//! the records it shows.
//!
//! Listing rules:
//! - `.` is never listed
//! - directories are always listed, shown with a trailing `/`
//! - files are listed only when the filter set matches their name
//! - `../` is moved to the front when it appears
//! - a listing with nothing in it shows a single `./`

use core_types::Pooled;
use services_logger::LogEntry;

use crate::directory::{RawDirectoryBuffer, RawEntry};
use crate::filter::FilterSet;
use crate::{FsContext, FsError};

const COMPONENT: &str = "fs_view::listing";

/// Label of the synthetic entry that re-lists the current directory
pub const CURRENT_DIR: &str = "./";

/// Label of the parent directory entry
pub const PARENT_DIR: &str = "../";

/// One line of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEntry {
    /// A record of the raw buffer
    Record {
        /// Byte offset of the record in the raw buffer
        offset: usize,
        /// Name length in UTF-16 units
        name_units: usize,
        directory: bool,
    },
    /// The synthetic `./` entry of an otherwise empty listing
    Current,
}

impl DisplayEntry {
    pub fn is_directory(&self) -> bool {
        match self {
            DisplayEntry::Record { directory, .. } => *directory,
            DisplayEntry::Current => true,
        }
    }

    fn from_raw(entry: &RawEntry<'_>) -> Self {
        DisplayEntry::Record {
            offset: entry.offset(),
            name_units: entry.name_units(),
            directory: entry.is_directory(),
        }
    }
}

/// Filtered listing of one directory
#[derive(Debug)]
pub struct DisplayList<'a> {
    buffer: &'a RawDirectoryBuffer,
    entries: Pooled<Vec<DisplayEntry>>,
}

impl<'a> DisplayList<'a> {
    /// Number of entries; never zero
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<DisplayEntry> {
        self.entries.get(index).copied()
    }

    /// The label shown for entry `index`
    pub fn label(&self, index: usize) -> Option<String> {
        self.get(index).map(|entry| self.label_of(entry))
    }

    /// Labels of every entry, in order
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|entry| self.label_of(*entry)).collect()
    }

    fn label_of(&self, entry: DisplayEntry) -> String {
        match entry {
            DisplayEntry::Record {
                offset, directory, ..
            } => {
                let mut name = self
                    .buffer
                    .entry_at(offset)
                    .map(|raw| raw.name())
                    .unwrap_or_default();
                if directory {
                    name.push('/');
                }
                name
            }
            DisplayEntry::Current => CURRENT_DIR.to_string(),
        }
    }
}

/// Builds display listings from raw directory buffers
pub struct EntryTransformer<'a> {
    ctx: &'a FsContext<'a>,
}

impl<'a> EntryTransformer<'a> {
    pub fn new(ctx: &'a FsContext<'a>) -> Self {
        Self { ctx }
    }

    /// Counts the records that may appear in the listing
    ///
    /// Directories always count; files count when a filter matches. The
    /// count includes `.` and so may exceed the final listing by one.
    pub fn count_candidates(&self, buffer: &RawDirectoryBuffer, filters: &FilterSet) -> usize {
        buffer
            .entries()
            .filter(|entry| entry.is_directory() || filters.matches(entry))
            .count()
    }

    /// Builds the listing for `buffer`
    pub fn transform<'b>(
        &self,
        buffer: &'b RawDirectoryBuffer,
        filters: &FilterSet,
    ) -> Result<DisplayList<'b>, FsError> {
        let candidates = self.count_candidates(buffer, filters);
        let slots = candidates.max(1);
        let mut entries = self
            .ctx
            .pool
            .allocate_slots::<DisplayEntry>(slots)
            .map_err(|err| {
                self.ctx.sink.log(
                    LogEntry::error(COMPONENT, "failed to allocate listing")
                        .with_field("slots", slots),
                );
                FsError::from(err)
            })?;

        for raw in buffer.entries() {
            if raw.name_is(".") {
                continue;
            }
            if !raw.is_directory() && !filters.matches(&raw) {
                continue;
            }
            entries.push(DisplayEntry::from_raw(&raw));
            if raw.is_directory() && raw.name_is("..") {
                let last = entries.len() - 1;
                entries.swap(0, last);
            }
        }

        if entries.is_empty() {
            entries.push(DisplayEntry::Current);
        }

        self.ctx.sink.log(
            LogEntry::debug(COMPONENT, "built listing")
                .with_field("records", buffer.len())
                .with_field("entries", entries.len())
                .with_field("filter", filters),
        );

        Ok(DisplayList { buffer, entries })
    }
}
