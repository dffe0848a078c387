//! # Picker Host Runtime
//!
//! Runs the file picker against directories on the host.
//!
//! ## Philosophy
//!
//! - **Same navigator, real files**: host directories are mounted behind the
//!   firmware volume traits, so the picker code path is the one used at boot
//! - **Stdout is the result**: menus and logs go to stderr
//! - **Deterministic mode is first-class**: scripts answer menus for tests
//!
//! ## Responsibilities
//!
//! - Loads a JSON configuration and applies command-line overrides
//! - Mounts host directories as read-only volumes
//! - Drives one picker session on a terminal or a script
//!
//! ## Non-Responsibilities
//!
//! - Writing to volumes
//! - Launching the selected file

pub mod config;
pub mod host_volume;
pub mod input_script;
pub mod runtime;
pub mod terminal;

pub use config::{ConfigError, PickerConfig, VolumeConfig};
pub use host_volume::{HostVolume, HostVolumeSet};
pub use input_script::{InputScript, InputScriptError, ScriptConsole, ScriptedInput};
pub use runtime::{HostRuntime, HostRuntimeConfig, HostRuntimeError, Selection};
pub use terminal::TerminalConsole;
