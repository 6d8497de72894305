//! Mixed-endian GUIDs
//!
//! GPT stores the first three GUID fields little-endian and the last two as a
//! plain byte sequence. [`Guid`] keeps the on-disk order and converts to the
//! canonical (big-endian) order for display.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Swap between canonical and on-disk GUID byte order
///
/// Applying it twice yields the input.
pub const fn swap_mixed_endian(b: [u8; 16]) -> [u8; 16] {
    [
        b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12], b[13],
        b[14], b[15],
    ]
}

/// A GUID in on-disk (mixed-endian) byte order
///
/// Serializes as its canonical hyphenated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    /// The all-zero GUID marking an unused GPT slot
    pub const ZERO: Guid = Guid([0u8; 16]);

    /// Build from on-disk bytes
    pub const fn from_disk(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    /// Build from canonical bytes, as written in a GUID string
    pub const fn from_canonical(bytes: [u8; 16]) -> Self {
        Guid(swap_mixed_endian(bytes))
    }

    /// Parse a textual GUID such as `c12a7328-f81f-11d2-ba4b-00a0c93ec93b`
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text)
            .ok()
            .map(|uuid| Self::from_canonical(*uuid.as_bytes()))
    }

    /// A fresh random (version 4) GUID
    pub fn new_random() -> Self {
        Self::from_canonical(*Uuid::new_v4().as_bytes())
    }

    /// On-disk bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Canonical bytes
    pub fn canonical(&self) -> [u8; 16] {
        swap_mixed_endian(self.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.canonical()).hyphenated())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Uuid::from_bytes(self.canonical()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(|uuid| Self::from_canonical(*uuid.as_bytes()))
    }
}
