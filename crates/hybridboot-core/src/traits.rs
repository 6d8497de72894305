//! Collaborator traits
//!
//! The codecs only need a few facts from the outside world: where the boot
//! images of an ISO live, and optionally a file name for a block. These are
//! expressed as traits so the read and write paths can be tested without a
//! real ISO 9660 filesystem.

use crate::{error::Result, types::Zone};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};

/// Trait for partition tables (zone tables)
pub trait ZoneTable {
    /// Get a human-readable identifier for this zone table type
    fn identify(&self) -> &str;

    /// Get all zones in this partition table
    fn enumerate_zones(&self) -> &[Zone];

    /// Get a specific zone by position
    fn get_zone(&self, index: usize) -> Option<&Zone> {
        self.enumerate_zones().get(index)
    }
}

/// Combined trait for Read + Seek
pub trait ReadSeek: Read + Seek + Send {}

/// Blanket implementation for any type that implements Read + Seek
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Maps a block address to the name of the file starting there
///
/// The address is in 512-byte units. Lookups are annotation only; a resolver
/// that knows nothing returns `None`.
pub trait NameResolver {
    fn block_to_name(&mut self, block: u64) -> Option<String>;
}

/// Resolver that never knows a name
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNames;

impl NameResolver for NoNames {
    fn block_to_name(&mut self, _block: u64) -> Option<String> {
        None
    }
}

/// Location of one boot image, in 2048-byte ISO blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootImage {
    /// First 2048-byte block of the image
    pub lba: u32,

    /// Image size in 512-byte sectors
    pub sectors: u32,
}

/// What the builder needs to know about an ISO's El Torito catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootImages {
    /// Boot catalog location, `None` if the ISO has no El Torito record
    pub catalog_lba: Option<u32>,

    /// Default (BIOS) boot image location, 0 when legacy boot is not used
    pub boot_lba: u32,

    /// EFI System image, if the catalog carries an EFI section
    pub efi: Option<BootImage>,

    /// Mac HFS+ image
    pub mac: Option<BootImage>,
}

impl BootImages {
    pub fn has_catalog(&self) -> bool {
        self.catalog_lba.is_some()
    }
}

/// Source of El Torito boot image locations
pub trait BootCatalogProvider {
    /// Locate the boot images
    ///
    /// `want_efi` and `want_mac` select which platform sections are looked up.
    fn boot_images(&mut self, want_efi: bool, want_mac: bool) -> Result<BootImages>;
}
