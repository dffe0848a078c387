//! # Host Runtime
//!
//! Mounts the configured host directories and runs one picker session
//! against them.

use crate::config::{ConfigError, PickerConfig};
use crate::host_volume::HostVolumeSet;
use crate::input_script::{InputScript, InputScriptError, ScriptConsole};
use crate::terminal::TerminalConsole;
use core_types::{BootPool, ProtocolIds};
use fs_view::FsContext;
use hal::{ConsoleSelect, VolumeHandle};
use services_file_picker::{FilePicker, FilePickerError, PickerOutcome, PickerRequest};
use services_logger::{FacadeSink, LogEntry, LogSink};
use std::path::PathBuf;
use thiserror::Error;

const COMPONENT: &str = "pickerd::runtime";

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Script error: {0}")]
    Script(#[from] InputScriptError),

    #[error("Picker error: {0}")]
    Picker(#[from] FilePickerError),
}

/// Host runtime configuration
#[derive(Debug, Clone, Default)]
pub struct HostRuntimeConfig {
    /// Volumes and picker request
    pub config: PickerConfig,
    /// Optional input script; without one the terminal is used
    pub script: Option<String>,
}

/// A file chosen in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub volume: VolumeHandle,
    /// Path on the volume, such as `\EFI\BOOT\BOOTX64.EFI`
    pub path: String,
    /// The same file on the host
    pub host_path: Option<PathBuf>,
}

/// Host runtime
pub struct HostRuntime {
    config: PickerConfig,
    script: Option<InputScript>,
    pool: BootPool,
    protocols: ProtocolIds,
    sink: Box<dyn LogSink>,
    volumes: HostVolumeSet,
}

impl HostRuntime {
    /// Validates the configuration and mounts its volumes
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        config.config.validate()?;
        let script = config
            .script
            .as_deref()
            .map(InputScript::from_text)
            .transpose()?;

        let protocols = ProtocolIds::standard();
        let volumes = HostVolumeSet::from_config(protocols, &config.config.volumes);

        Ok(Self {
            config: config.config,
            script,
            pool: BootPool::new(),
            protocols,
            sink: Box::new(FacadeSink),
            volumes,
        })
    }

    /// Replaces the log destination
    pub fn with_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Shares the allocation ledger, e.g. for symmetry checks
    pub fn pool(&self) -> &BootPool {
        &self.pool
    }

    pub fn volumes(&self) -> &HostVolumeSet {
        &self.volumes
    }

    /// The request one session runs
    pub fn request(&self) -> PickerRequest {
        let mut request = PickerRequest::new(self.config.title.iter());
        if let Some(handle) = self
            .config
            .volume
            .and_then(|index| self.volumes.handles().get(index).copied())
        {
            request = request.with_volume(handle);
        }
        if let Some(start) = &self.config.start {
            request = request.with_start(start.as_str());
        }
        if let Some(filter) = &self.config.filter {
            request = request.with_filter(filter.as_str());
        }
        request
    }

    /// Runs a session on the script if one was given, else on the terminal
    pub fn run(&mut self) -> Result<Option<Selection>, HostRuntimeError> {
        match self.script.take() {
            Some(script) => self.run_with(ScriptConsole::new(script)),
            None => self.run_with(TerminalConsole::stdio()),
        }
    }

    /// Runs a session answering menus from `console`
    pub fn run_with(
        &mut self,
        console: impl ConsoleSelect,
    ) -> Result<Option<Selection>, HostRuntimeError> {
        let request = self.request();
        let ctx = FsContext::new(&self.pool, &self.protocols, self.sink.as_ref());

        let outcome = {
            let mut picker = FilePicker::new(&ctx, &mut self.volumes, console);
            picker.run(&request)?
        };

        let selection = match &outcome {
            PickerOutcome::Selected { volume, path } => Some(Selection {
                volume: *volume,
                path: path.to_string(),
                host_path: self.volumes.host_path(*volume, path.as_str()),
            }),
            PickerOutcome::Cancelled => None,
        };

        if let Some(selection) = &selection {
            let mut entry = LogEntry::info(COMPONENT, "session finished")
                .with_field("volume", selection.volume)
                .with_field("path", &selection.path);
            if let Some(host_path) = &selection.host_path {
                entry = entry.with_field("host_path", host_path.display());
            }
            self.sink.log(entry);
        }
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VolumeConfig;
    use hal::ScriptedSelect;
    use services_logger::NullSink;

    fn config_for(dir: &std::path::Path) -> PickerConfig {
        let mut config = PickerConfig::new();
        config
            .volumes
            .push(VolumeConfig::new(dir.display().to_string()).with_label("HOST"));
        config
    }

    #[test]
    fn test_runtime_requires_volumes() {
        let err = HostRuntime::new(HostRuntimeConfig::default()).err();
        assert!(matches!(
            err,
            Some(HostRuntimeError::Config(ConfigError::NoVolumes))
        ));
    }

    #[test]
    fn test_runtime_rejects_bad_script() {
        let config = HostRuntimeConfig {
            config: config_for(&std::env::temp_dir()),
            script: Some("# only comments".to_string()),
        };
        let err = HostRuntime::new(config).err();
        assert!(matches!(
            err,
            Some(HostRuntimeError::Script(InputScriptError::EmptyScript))
        ));
    }

    #[test]
    fn test_request_maps_volume_index() {
        let mut config = config_for(&std::env::temp_dir());
        config.volumes.push(VolumeConfig::new("/srv/other"));
        config.volume = Some(1);
        config.start = Some("\\EFI".to_string());
        config.filter = Some(".efi".to_string());

        let runtime = HostRuntime::new(HostRuntimeConfig {
            config,
            script: None,
        })
        .unwrap();
        let request = runtime.request();
        assert_eq!(request.volume, Some(runtime.volumes().handles()[1]));
        assert_eq!(request.start.as_deref(), Some("\\EFI"));
        assert_eq!(request.filter.as_deref(), Some(".efi"));
        assert_eq!(request.title, vec!["Select a file".to_string()]);
    }

    #[test]
    fn test_cancel_at_volume_menu() {
        let mut runtime = HostRuntime::new(HostRuntimeConfig {
            config: config_for(&std::env::temp_dir()),
            script: None,
        })
        .unwrap()
        .with_sink(Box::new(NullSink));

        let mut console = ScriptedSelect::new([None]);
        assert_eq!(runtime.run_with(&mut console).unwrap(), None);
        assert_eq!(console.last_entries(), Some(&["HOST".to_string()][..]));
        assert!(runtime.pool().stats().is_balanced());
    }
}
