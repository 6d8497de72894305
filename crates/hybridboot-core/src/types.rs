//! Core types shared by the codecs and the inspector

use serde::{Deserialize, Serialize};
use std::fmt;

/// A zone (partition) within a disk, in bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Partition number as the table reports it
    pub index: usize,

    /// Offset from start of disk in bytes
    pub offset: u64,

    /// Length of zone in bytes
    pub length: u64,

    /// Type of zone (e.g., "efi", "hfs+", "fat32 lba")
    pub zone_type: String,
}

impl Zone {
    /// Create a new zone
    pub fn new(index: usize, offset: u64, length: u64, zone_type: impl Into<String>) -> Self {
        Self {
            index,
            offset,
            length,
            zone_type: zone_type.into(),
        }
    }

    /// Byte offset one past the end of the zone
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Zone {} [{} @ 0x{:08X}, {} bytes]",
            self.index, self.zone_type, self.offset, self.length
        )
    }
}
