//! # Storage Service
//!
//! Simulated storage devices for the navigator.
//!
//! ## Philosophy
//!
//! **Storage is exercised through the same traits firmware implements.**
//!
//! Nothing here is special-cased for tests: the navigator sees a
//! [`hal::VolumeProvider`] and cannot tell a memory volume from a real one.
//!
//! ## Design
//!
//! - **MemoryVolumeSet**: handle database of in-memory volumes with handle accounting
//! - **FailingVolumeSet**: deterministic fault injection around any provider

pub mod failing_volume;
pub mod memory_volume;

pub use failing_volume::{FailingVolumeSet, FailurePolicy};
pub use memory_volume::{CallStats, MemoryNode, MemoryVolume, MemoryVolumeSet};
