//! # Volume Selector Service
//!
//! Lists the volumes that expose the storage protocol and lets the user pick
//! one from a menu.
//!
//! ## Philosophy
//!
//! - **Partial is fine, empty is not**: a volume that cannot be opened is
//!   logged and left out; enumeration only fails when nothing is usable
//! - **Names are borrowed for the menu only**: per-volume names are released
//!   once the chosen one has been copied out
//!
//! ## Example
//!
//! ```ignore
//! let selector = VolumeSelector::new(&ctx);
//! match selector.select(&mut provider, &mut console, &title)? {
//!     Some(volume) => println!("{} on {}", volume.name(), volume.handle),
//!     None => println!("cancelled"),
//! }
//! ```

use core_types::{MemoryError, Pooled};
use fs_view::FsContext;
use hal::{ConsoleSelect, FileError, FileGuard, VolumeHandle, VolumeProvider};
use services_logger::LogEntry;
use std::fmt;
use thiserror::Error;

const COMPONENT: &str = "services_volume_selector";

/// Error type for volume enumeration and selection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VolumeError {
    #[error("No volume exposes the storage protocol")]
    NotFound,

    #[error("None of the {located} located volumes could be opened")]
    NoUsableVolumes { located: usize },

    #[error(transparent)]
    OutOfResources(#[from] MemoryError),
}

/// A usable volume and the name shown for it
#[derive(Debug)]
pub struct VolumeDescriptor {
    pub handle: VolumeHandle,
    name: Pooled<String>,
}

impl VolumeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Step at which a volume was given up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStage {
    /// Storage protocol lookup
    Protocol,
    /// Opening the volume root
    OpenVolume,
    /// Querying volume information
    VolumeInfo,
}

impl fmt::Display for SkipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            SkipStage::Protocol => "protocol",
            SkipStage::OpenVolume => "open_volume",
            SkipStage::VolumeInfo => "volume_info",
        };
        write!(f, "{}", stage)
    }
}

/// A located volume left out of the enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedVolume {
    pub handle: VolumeHandle,
    pub stage: SkipStage,
    pub error: FileError,
}

/// Result of enumerating volumes
#[derive(Debug)]
pub struct Enumeration {
    volumes: Pooled<Vec<VolumeDescriptor>>,
    skipped: Vec<SkippedVolume>,
}

impl Enumeration {
    /// Usable volumes, in located order
    pub fn volumes(&self) -> &[VolumeDescriptor] {
        &self.volumes
    }

    pub fn skipped(&self) -> &[SkippedVolume] {
        &self.skipped
    }

    /// Returns true if some located volume was left out
    pub fn is_incomplete(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Menu labels, one per usable volume
    pub fn names(&self) -> Vec<String> {
        self.volumes.iter().map(|v| v.name().to_string()).collect()
    }
}

/// Finds usable volumes
pub struct VolumeEnumerator<'a> {
    ctx: &'a FsContext<'a>,
}

impl<'a> VolumeEnumerator<'a> {
    pub fn new(ctx: &'a FsContext<'a>) -> Self {
        Self { ctx }
    }

    /// Lists every volume whose root can be opened and described
    pub fn enumerate(
        &self,
        provider: &mut (impl VolumeProvider + ?Sized),
    ) -> Result<Enumeration, VolumeError> {
        let handles = provider.locate_handles(&self.ctx.protocols.simple_file_system);
        if handles.is_empty() {
            self.ctx
                .sink
                .log(LogEntry::warn(COMPONENT, "no volumes located"));
            return Err(VolumeError::NotFound);
        }

        let mut volumes = self.ctx.pool.allocate_slots::<VolumeDescriptor>(handles.len())?;
        let mut skipped = Vec::new();

        for &handle in &handles {
            match self.describe(provider, handle) {
                Ok(name) => volumes.push(VolumeDescriptor { handle, name }),
                Err(Describe::Skipped(skip)) => {
                    self.ctx.sink.log(
                        LogEntry::warn(COMPONENT, "skipping volume")
                            .with_field("volume", skip.handle)
                            .with_field("stage", skip.stage)
                            .with_field("error", &skip.error),
                    );
                    skipped.push(skip);
                }
                Err(Describe::OutOfResources(err)) => {
                    self.ctx.sink.log(
                        LogEntry::error(COMPONENT, "failed to allocate volume name")
                            .with_field("volume", handle),
                    );
                    return Err(err.into());
                }
            }
        }

        if volumes.is_empty() {
            self.ctx.sink.log(
                LogEntry::error(COMPONENT, "no usable volumes")
                    .with_field("located", handles.len()),
            );
            return Err(VolumeError::NoUsableVolumes {
                located: handles.len(),
            });
        }

        self.ctx.sink.log(
            LogEntry::info(COMPONENT, "enumerated volumes")
                .with_field("usable", volumes.len())
                .with_field("skipped", skipped.len()),
        );
        Ok(Enumeration { volumes, skipped })
    }

    fn describe(
        &self,
        provider: &mut (impl VolumeProvider + ?Sized),
        handle: VolumeHandle,
    ) -> Result<Pooled<String>, Describe> {
        let skip = |stage: SkipStage| {
            move |error: FileError| Describe::Skipped(SkippedVolume { handle, stage, error })
        };

        let mut fs = provider
            .handle_protocol(handle, &self.ctx.protocols.simple_file_system)
            .map_err(skip(SkipStage::Protocol))?;
        let mut root = fs
            .open_volume()
            .map(FileGuard::new)
            .map_err(skip(SkipStage::OpenVolume))?;
        let info = root
            .file_system_info(&self.ctx.protocols.file_system_info)
            .map_err(skip(SkipStage::VolumeInfo))?;

        let label = info.volume_label.as_str();
        let name = if label.is_empty() || label == " " {
            provider
                .device_path_text(handle)
                .unwrap_or_else(|| handle.to_string())
        } else {
            label.to_string()
        };
        self.ctx
            .pool
            .allocate_str(&name)
            .map_err(Describe::OutOfResources)
    }
}

enum Describe {
    Skipped(SkippedVolume),
    OutOfResources(MemoryError),
}

/// The volume the user picked
#[derive(Debug)]
pub struct SelectedVolume {
    pub handle: VolumeHandle,
    name: Pooled<String>,
}

impl SelectedVolume {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Presents the usable volumes as a menu
pub struct VolumeSelector<'a> {
    ctx: &'a FsContext<'a>,
}

impl<'a> VolumeSelector<'a> {
    pub fn new(ctx: &'a FsContext<'a>) -> Self {
        Self { ctx }
    }

    /// Lets the user pick a volume
    ///
    /// Returns `Ok(None)` when the menu is cancelled.
    pub fn select(
        &self,
        provider: &mut (impl VolumeProvider + ?Sized),
        console: &mut (impl ConsoleSelect + ?Sized),
        title: &[String],
    ) -> Result<Option<SelectedVolume>, VolumeError> {
        let enumeration = VolumeEnumerator::new(self.ctx).enumerate(provider)?;
        let names = enumeration.names();

        let Some(index) = console.select(title, &names, 0) else {
            self.ctx
                .sink
                .log(LogEntry::info(COMPONENT, "volume selection cancelled"));
            return Ok(None);
        };
        let Some(chosen) = enumeration.volumes().get(index) else {
            self.ctx.sink.log(
                LogEntry::warn(COMPONENT, "menu returned an index out of range")
                    .with_field("index", index)
                    .with_field("entries", names.len()),
            );
            return Ok(None);
        };

        let name = self.ctx.pool.allocate_str(chosen.name())?;
        self.ctx.sink.log(
            LogEntry::info(COMPONENT, "volume selected")
                .with_field("volume", chosen.handle)
                .with_field("name", chosen.name()),
        );
        Ok(Some(SelectedVolume {
            handle: chosen.handle,
            name,
        }))
    }
}
