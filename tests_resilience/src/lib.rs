//! Resilience Test Utilities
//!
//! This crate provides shared fixtures for cross-crate resilience tests.
//!
//! ## Test Philosophy
//!
//! - **Release under faults**: every pool allocation and every open handle is
//!   given back, whichever step of a session fails
//! - **Deterministic failures**: faults come from [`FailurePolicy`] and
//!   [`BootPool::failing_after`], never from timing
//! - **Errors, not panics**: a failing volume or allocation surfaces as an
//!   error value or a skipped volume

use core_types::{BootPool, ProtocolIds};
use fs_view::FsContext;
use services_logger::MemorySink;
use services_storage::{CallStats, MemoryVolume, MemoryVolumeSet};

pub use services_storage::FailurePolicy;

/// Pool, protocol ids and log sink for one test session
pub struct TestSession {
    pub pool: BootPool,
    pub protocols: ProtocolIds,
    pub sink: MemorySink,
}

impl TestSession {
    pub fn new() -> Self {
        Self::with_pool(BootPool::new())
    }

    pub fn with_pool(pool: BootPool) -> Self {
        Self {
            pool,
            protocols: ProtocolIds::standard(),
            sink: MemorySink::new(),
        }
    }

    pub fn ctx(&self) -> FsContext<'_> {
        FsContext::new(&self.pool, &self.protocols, &self.sink)
    }

    /// Panics unless every allocation made in the session was released
    pub fn assert_balanced(&self) {
        let stats = self.pool.stats();
        assert!(
            stats.is_balanced(),
            "pool leaked {} allocation(s), {} byte(s)",
            stats.outstanding(),
            stats.outstanding_bytes
        );
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

/// A boot partition with a loader, a config file and key files
pub fn esp_volume() -> MemoryVolume {
    MemoryVolume::new("ESP")
        .with_file("\\EFI\\BOOT\\BOOTX64.EFI", b"MZ".to_vec())
        .with_file("\\EFI\\BOOT\\grub.cfg", b"set default=0".to_vec())
        .with_file("\\EFI\\keys\\db.auth", b"db".to_vec())
        .with_file("\\EFI\\keys\\KEK.esl", b"kek".to_vec())
        .with_dir("\\EFI\\empty")
        .with_file("\\startup.nsh", b"fs0:".to_vec())
}

/// A data partition without a label
pub fn data_volume() -> MemoryVolume {
    MemoryVolume::new("")
        .with_device_path("PciRoot(0x0)/Pci(0x1,0x1)/Sata(0x0)")
        .with_file("\\notes.txt", b"x".to_vec())
}

/// ESP and data volumes, mounted in that order
pub fn standard_volumes() -> MemoryVolumeSet {
    MemoryVolumeSet::new(ProtocolIds::standard())
        .with_volume(esp_volume())
        .with_volume(data_volume())
}

/// Panics unless every opened handle was closed
pub fn assert_handles_closed(stats: CallStats) {
    assert_eq!(
        stats.opens, stats.closes,
        "{} handle(s) left open",
        stats.open_handles()
    );
}
