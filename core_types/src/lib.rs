//! # Core Types
//!
//! This crate defines the fundamental types shared by the navigator crates.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: protocol identifiers are passed in, never global.
//! - **Ownership is visible**: pool allocations are values that release on drop.
//!
//! ## Key Types
//!
//! - [`Guid`]: Identifier for a firmware protocol or info record
//! - [`ProtocolIds`]: The identifiers one session uses, resolved once
//! - [`BootPool`]: Allocation ledger with failure injection
//! - [`Pooled`]: A value backed by pool bytes

pub mod ids;
pub mod memory;
pub mod protocols;

pub use ids::Guid;
pub use memory::{align_to_page, BootPool, MemoryError, PoolStats, Pooled, PAGE_SIZE};
pub use protocols::{
    ProtocolIds, FILE_INFO_ID, FILE_SYSTEM_INFO_ID, LOADED_IMAGE_PROTOCOL,
    SIMPLE_FILE_SYSTEM_PROTOCOL,
};
