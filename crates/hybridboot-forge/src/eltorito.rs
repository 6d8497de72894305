//! ISO 9660 volume size and El Torito boot catalog
//!
//! Only the fields the hybrid layout depends on are decoded: the volume size
//! from the primary volume descriptor, the catalog location from the boot
//! record, and the default, EFI and Mac entries of the catalog.

use crate::image::read_at;
use hybridboot_core::bytes::{read_u16_le, read_u32_le};
use hybridboot_core::{BootCatalogProvider, BootImage, BootImages, Error, Result};
use std::io::{Read, Seek};

/// ISO 9660 logical sector size
pub const ISO_SECTOR_SIZE: u64 = 2048;

/// Sector of the primary volume descriptor
pub const PVD_SECTOR: u64 = 16;

/// Sector of the El Torito boot record
pub const BOOT_RECORD_SECTOR: u64 = 17;

/// Boot record prefix up to the catalog pointer
pub const BOOT_RECORD_BANNER: [u8; 71] = {
    let text = b"\0CD001\x01EL TORITO SPECIFICATION";
    let mut banner = [0u8; 71];
    let mut i = 0;
    while i < text.len() {
        banner[i] = text[i];
        i += 1;
    }
    banner
};

/// Platform id of EFI sections
pub const PLATFORM_EFI: u8 = 0xEF;

/// Size of one catalog record
pub const RECORD_SIZE: usize = 32;

/// Volume size as recorded in the primary volume descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryVolume {
    pub volume_blocks: u32,
    pub block_size: u16,
}

impl PrimaryVolume {
    pub fn from_bytes(sector: &[u8]) -> Self {
        Self {
            volume_blocks: read_u32_le(sector, 80),
            block_size: read_u16_le(sector, 128),
        }
    }

    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut sector = vec![0u8; ISO_SECTOR_SIZE as usize];
        read_at(reader, PVD_SECTOR * ISO_SECTOR_SIZE, &mut sector)?;
        Ok(Self::from_bytes(&sector))
    }

    /// Bytes covered by the filesystem
    pub fn iso_size(&self) -> u64 {
        self.volume_blocks as u64 * self.block_size as u64
    }
}

/// One 32-byte catalog record, by header id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRecord {
    /// Header id 0x01
    Validation {
        platform: u8,
        /// 16-bit word sum is zero and the key is 0xAA55
        valid: bool,
    },
    /// Header id 0x90, or 0x91 for the last section
    SectionHeader {
        last: bool,
        platform: u8,
        entries: u16,
    },
    /// Header id 0x88 (bootable) or 0x00
    SectionEntry {
        bootable: bool,
        media: u8,
        load_segment: u16,
        system_type: u8,
        /// In 512-byte sectors
        sector_count: u16,
        load_lba: u32,
    },
    /// Header id 0x44
    Extension,
    Unknown(u8),
}

impl CatalogRecord {
    pub fn from_bytes(raw: &[u8]) -> Self {
        match raw[0] {
            0x01 => {
                let sum = raw[..RECORD_SIZE]
                    .chunks_exact(2)
                    .fold(0u16, |sum, w| sum.wrapping_add(u16::from_le_bytes([w[0], w[1]])));
                CatalogRecord::Validation {
                    platform: raw[1],
                    valid: sum == 0 && read_u16_le(raw, 30) == 0xAA55,
                }
            }
            id @ (0x90 | 0x91) => CatalogRecord::SectionHeader {
                last: id == 0x91,
                platform: raw[1],
                entries: read_u16_le(raw, 2),
            },
            id @ (0x88 | 0x00) => CatalogRecord::SectionEntry {
                bootable: id == 0x88,
                media: raw[1],
                load_segment: read_u16_le(raw, 2),
                system_type: raw[4],
                sector_count: read_u16_le(raw, 6),
                load_lba: read_u32_le(raw, 8),
            },
            0x44 => CatalogRecord::Extension,
            id => CatalogRecord::Unknown(id),
        }
    }
}

/// Boot catalog read from an ISO image
///
/// Holds the boot record and catalog sectors; [`BootCatalogProvider`] decodes
/// them on request.
#[derive(Debug, Clone)]
pub struct IsoBootCatalog {
    catalog_lba: Option<u32>,
    catalog: Vec<u8>,
    legacy: bool,
}

impl IsoBootCatalog {
    /// Read the boot record at sector 17 and the catalog it points to
    ///
    /// With `legacy` the catalog must start with a valid validation entry and
    /// a bootable no-emulation default entry.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R, legacy: bool) -> Result<Self> {
        let mut record = vec![0u8; ISO_SECTOR_SIZE as usize];
        read_at(reader, BOOT_RECORD_SECTOR * ISO_SECTOR_SIZE, &mut record)?;

        let catalog_lba = Self::catalog_lba(&record);
        let mut catalog = vec![0u8; ISO_SECTOR_SIZE as usize];
        match catalog_lba {
            Some(lba) => {
                tracing::debug!("catalogue offset: {}", lba);
                read_at(reader, lba as u64 * ISO_SECTOR_SIZE, &mut catalog)?;
            }
            None => tracing::debug!("no El Torito boot record"),
        }

        Ok(Self::from_sectors(catalog_lba, catalog, legacy))
    }

    pub fn from_sectors(catalog_lba: Option<u32>, mut catalog: Vec<u8>, legacy: bool) -> Self {
        catalog.resize(ISO_SECTOR_SIZE as usize, 0);
        Self {
            catalog_lba,
            catalog,
            legacy,
        }
    }

    /// Catalog location from a boot record sector, if it has the banner
    pub fn catalog_lba(boot_record: &[u8]) -> Option<u32> {
        if boot_record.len() < BOOT_RECORD_BANNER.len() + 4
            || boot_record[..BOOT_RECORD_BANNER.len()] != BOOT_RECORD_BANNER
        {
            return None;
        }
        match read_u32_le(boot_record, BOOT_RECORD_BANNER.len()) {
            0 => None,
            lba => Some(lba),
        }
    }

    /// Record `index` of the catalog sector
    pub fn record(&self, index: usize) -> CatalogRecord {
        match self.raw_record(index) {
            Some(raw) => CatalogRecord::from_bytes(raw),
            None => CatalogRecord::Unknown(0xFF),
        }
    }

    /// Raw 32-byte record `index`, `None` past the end of the sector
    fn raw_record(&self, index: usize) -> Option<&[u8]> {
        let start = index * RECORD_SIZE;
        self.catalog.get(start..start + RECORD_SIZE)
    }

    /// EFI-platform image at `cursor`
    ///
    /// Any record whose platform byte is 0xEF opens the section, including
    /// the validation entry of an EFI-only catalog. The next record gives the
    /// sector count at byte 6 and the load LBA at byte 8.
    fn efi_image(&self, cursor: usize) -> Result<Option<BootImage>> {
        match self.raw_record(cursor) {
            Some(raw) if raw[1] == PLATFORM_EFI => {}
            _ => return Ok(None),
        }

        match self.raw_record(cursor + 1) {
            Some(raw) if read_u32_le(raw, 8) != 0 => Ok(Some(BootImage {
                lba: read_u32_le(raw, 8),
                sectors: read_u16_le(raw, 6) as u32,
            })),
            _ => Err(Error::invalid_catalog("invalid efi catalogue")),
        }
    }
}

impl BootCatalogProvider for IsoBootCatalog {
    fn boot_images(&mut self, want_efi: bool, want_mac: bool) -> Result<BootImages> {
        let Some(catalog_lba) = self.catalog_lba else {
            return Ok(BootImages::default());
        };

        let mut images = BootImages {
            catalog_lba: Some(catalog_lba),
            ..Default::default()
        };
        let mut cursor = 0;

        if self.legacy {
            match self.record(0) {
                CatalogRecord::Validation { valid: true, .. } => {}
                _ => return Err(Error::invalid_catalog("invalid boot catalogue")),
            }

            match self.record(1) {
                CatalogRecord::SectionEntry {
                    bootable: true,
                    media: 0,
                    load_segment: 0 | 0x7C0,
                    load_lba,
                    ..
                } => images.boot_lba = load_lba,
                _ => {
                    return Err(Error::invalid_catalog(
                        "unexpected boot catalogue parameters",
                    ))
                }
            }
            cursor = 2;
        }

        if want_efi {
            images.efi = self.efi_image(cursor)?;
            match images.efi {
                Some(efi) => {
                    tracing::debug!("efi image at {}, {} sectors", efi.lba, efi.sectors);
                    cursor += 1;
                }
                None => tracing::warn!("unable to find efi image"),
            }
        }
        cursor += 1;

        if want_mac {
            images.mac = self.efi_image(cursor)?;
            if images.mac.is_none() {
                return Err(Error::invalid_catalog("unable to find mac efi image"));
            }
        }

        Ok(images)
    }
}

/// Total sectors from the FAT boot sector of an EFI image
///
/// The 16-bit count at byte 19 is used, or the 32-bit count at byte 32 when
/// that is zero. `None` without the 0xAA55 signature or with both counts zero.
pub fn bpb_total_sectors(boot_sector: &[u8]) -> Option<u32> {
    if boot_sector.len() < 512 || read_u16_le(boot_sector, 510) != 0xAA55 {
        return None;
    }
    match read_u16_le(boot_sector, 19) {
        0 => match read_u32_le(boot_sector, 32) {
            0 => None,
            count => Some(count),
        },
        count => Some(count as u32),
    }
}
