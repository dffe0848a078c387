//! # File Picker Service
//!
//! An interactive, menu-driven file picker for boot-time volumes.
//!
//! ## Philosophy
//!
//! - **Fresh listing every step**: each directory is read, filtered and shown,
//!   then released before the next step; nothing is cached
//! - **Cancel is an answer, not a failure**: leaving the menu yields
//!   [`PickerOutcome::Cancelled`]
//! - **Deterministic**: the listing order is the directory order, with `../`
//!   always first
//!
//! ## Flow
//!
//! ```text
//! SelectingVolume ─▶ ListingDirectory ─┬─▶ Descend ──────┐
//!  (no volume given)       ▲           ├─▶ Ascend ───────┤
//!                          │           ├─▶ StayAtCurrent ┤
//!                          └───────────┼─────────────────┘
//!                                      ├─▶ Accept (file)
//!                                      └─▶ Cancel
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use services_file_picker::{FilePicker, PickerOutcome, PickerRequest};
//!
//! let mut picker = FilePicker::new(&ctx, provider, console);
//! let request = PickerRequest::new(["Select a key file"]).with_filter(".auth|.esl");
//! match picker.run(&request)? {
//!     PickerOutcome::Selected { volume, path } => {
//!         // open `path` on `volume`
//!     }
//!     PickerOutcome::Cancelled => {}
//! }
//! ```

use core_types::{MemoryError, Pooled};
use fs_view::{
    read_dir_all, EntryTransformer, FilterSet, FsContext, FsError, PathState, CURRENT_DIR,
    PARENT_DIR,
};
use hal::{ConsoleSelect, VolumeHandle, VolumeProvider};
use services_logger::LogEntry;
use services_volume_selector::{VolumeError, VolumeSelector};
use std::fmt;
use thiserror::Error;

const COMPONENT: &str = "services_file_picker";

/// What the caller asks the picker for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickerRequest {
    /// Lines shown above every menu
    pub title: Vec<String>,
    /// Volume to browse; the user picks one when absent
    pub volume: Option<VolumeHandle>,
    /// Starting directory; the volume root when absent
    pub start: Option<String>,
    /// `|`-separated suffix filter; every file when absent
    pub filter: Option<String>,
}

impl PickerRequest {
    pub fn new<I, S>(title: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: VolumeHandle) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Result of a picker session
#[derive(Debug)]
pub enum PickerOutcome {
    /// A file was chosen
    Selected {
        /// Volume the file lives on
        volume: VolumeHandle,
        /// Absolute path of the file on that volume
        path: Pooled<String>,
    },
    /// The user left a menu
    Cancelled,
}

impl PickerOutcome {
    pub fn path(&self) -> Option<&str> {
        match self {
            PickerOutcome::Selected { path, .. } => Some(path.as_str()),
            PickerOutcome::Cancelled => None,
        }
    }

    pub fn volume(&self) -> Option<VolumeHandle> {
        match self {
            PickerOutcome::Selected { volume, .. } => Some(*volume),
            PickerOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PickerOutcome::Cancelled)
    }
}

/// Error type for picker sessions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilePickerError {
    #[error("Volume selection failed: {0}")]
    Volume(#[from] VolumeError),

    #[error("Listing failed: {0}")]
    Listing(#[from] FsError),

    #[error(transparent)]
    OutOfResources(#[from] MemoryError),
}

/// What to do with the entry the user chose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationStep {
    /// `./`: list the same directory again
    StayAtCurrent,
    /// `../`: go to the parent directory
    Ascend,
    /// A directory, named without its trailing `/`
    Descend(String),
    /// A file
    Accept(String),
    /// The menu was left
    Cancel,
}

impl NavigationStep {
    /// Interprets a listing label
    pub fn from_label(label: &str) -> Self {
        match label.strip_suffix('/') {
            Some(_) if label == CURRENT_DIR => NavigationStep::StayAtCurrent,
            Some(_) if label == PARENT_DIR => NavigationStep::Ascend,
            Some(directory) => NavigationStep::Descend(directory.to_string()),
            None => NavigationStep::Accept(label.to_string()),
        }
    }
}

impl fmt::Display for NavigationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationStep::StayAtCurrent => write!(f, "stay"),
            NavigationStep::Ascend => write!(f, "ascend"),
            NavigationStep::Descend(name) => write!(f, "descend({})", name),
            NavigationStep::Accept(name) => write!(f, "accept({})", name),
            NavigationStep::Cancel => write!(f, "cancel"),
        }
    }
}

/// Interactive file picker over a volume provider and a menu
pub struct FilePicker<'a, P: VolumeProvider, C: ConsoleSelect> {
    ctx: &'a FsContext<'a>,
    provider: P,
    console: C,
}

impl<'a, P: VolumeProvider, C: ConsoleSelect> FilePicker<'a, P, C> {
    pub fn new(ctx: &'a FsContext<'a>, provider: P, console: C) -> Self {
        Self {
            ctx,
            provider,
            console,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Gives back the provider and the console
    pub fn into_parts(self) -> (P, C) {
        (self.provider, self.console)
    }

    /// Runs one session until a file is chosen or a menu is cancelled
    pub fn run(&mut self, request: &PickerRequest) -> Result<PickerOutcome, FilePickerError> {
        let volume = match request.volume {
            Some(volume) => volume,
            None => {
                let selector = VolumeSelector::new(self.ctx);
                match selector.select(&mut self.provider, &mut self.console, &request.title)? {
                    Some(selected) => selected.handle,
                    None => return Ok(PickerOutcome::Cancelled),
                }
            }
        };

        let filters = FilterSet::parse(request.filter.as_deref().unwrap_or(""));
        let mut path = PathState::new(self.ctx.pool, request.start.as_deref().unwrap_or(""))?;
        self.ctx.sink.log(
            LogEntry::info(COMPONENT, "browsing volume")
                .with_field("volume", volume)
                .with_field("start", path.as_str())
                .with_field("filter", &filters),
        );

        loop {
            let step = self.choose(volume, &path, &filters, &request.title)?;
            self.ctx.sink.log(
                LogEntry::debug(COMPONENT, "navigation step")
                    .with_field("path", path.as_str())
                    .with_field("step", &step),
            );

            match step {
                NavigationStep::StayAtCurrent => {}
                NavigationStep::Ascend => {
                    if !path.ascend() {
                        self.ctx.sink.log(
                            LogEntry::warn(COMPONENT, "cannot ascend, appending parent segment")
                                .with_field("path", path.as_str()),
                        );
                        path.descend(self.ctx.pool, PARENT_DIR)?;
                    }
                }
                NavigationStep::Descend(directory) => path.descend(self.ctx.pool, &directory)?,
                NavigationStep::Accept(file) => {
                    let full = path.join_file(self.ctx.pool, &file)?;
                    self.ctx.sink.log(
                        LogEntry::info(COMPONENT, "file selected")
                            .with_field("volume", volume)
                            .with_field("path", full.as_str()),
                    );
                    return Ok(PickerOutcome::Selected { volume, path: full });
                }
                NavigationStep::Cancel => {
                    self.ctx
                        .sink
                        .log(LogEntry::info(COMPONENT, "file selection cancelled"));
                    return Ok(PickerOutcome::Cancelled);
                }
            }
        }
    }

    /// Lists `path` and asks the user for an entry
    ///
    /// The raw buffer and the listing are released before this returns.
    fn choose(
        &mut self,
        volume: VolumeHandle,
        path: &PathState,
        filters: &FilterSet,
        title: &[String],
    ) -> Result<NavigationStep, FilePickerError> {
        let buffer = read_dir_all(self.ctx, &mut self.provider, volume, path.as_str())?;
        let listing = EntryTransformer::new(self.ctx).transform(&buffer, filters)?;
        let labels = listing.labels();

        let Some(index) = self.console.select(title, &labels, 0) else {
            return Ok(NavigationStep::Cancel);
        };
        match labels.get(index) {
            Some(label) => Ok(NavigationStep::from_label(label)),
            None => {
                self.ctx.sink.log(
                    LogEntry::warn(COMPONENT, "menu returned an index out of range")
                        .with_field("index", index)
                        .with_field("entries", labels.len()),
                );
                Ok(NavigationStep::Cancel)
            }
        }
    }
}
