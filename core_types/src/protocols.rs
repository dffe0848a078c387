//! Protocol identifiers resolved once at startup
//!
//! Every component that looks up a protocol or queries an info record takes a
//! `&ProtocolIds` instead of reaching for global constants.

use crate::ids::Guid;
use serde::{Deserialize, Serialize};

/// Simple file system protocol
pub const SIMPLE_FILE_SYSTEM_PROTOCOL: Guid =
    Guid::from_u128(0x964e5b22_6459_11d2_8e39_00a0c969723b);

/// File info record
pub const FILE_INFO_ID: Guid = Guid::from_u128(0x09576e92_6d3f_11d2_8e39_00a0c969723b);

/// File system info record
pub const FILE_SYSTEM_INFO_ID: Guid = Guid::from_u128(0x09576e93_6d3f_11d2_8e39_00a0c969723b);

/// Loaded image protocol
pub const LOADED_IMAGE_PROTOCOL: Guid = Guid::from_u128(0x5b1b31a1_9562_11d2_8e3f_00a0c969723b);

/// The protocol and info-record identifiers a navigation session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolIds {
    /// Protocol exposing a volume's root directory
    pub simple_file_system: Guid,
    /// Per-file info record (size, attributes, name)
    pub file_info: Guid,
    /// Per-volume info record (label, sizes)
    pub file_system_info: Guid,
    /// Loaded image protocol
    pub loaded_image: Guid,
}

impl ProtocolIds {
    /// The standard firmware identifiers
    pub const fn standard() -> Self {
        Self {
            simple_file_system: SIMPLE_FILE_SYSTEM_PROTOCOL,
            file_info: FILE_INFO_ID,
            file_system_info: FILE_SYSTEM_INFO_ID,
            loaded_image: LOADED_IMAGE_PROTOCOL,
        }
    }
}

impl Default for ProtocolIds {
    fn default() -> Self {
        Self::standard()
    }
}
