//! MBR partition entries and type names

use crate::geometry::{offset_to_chs, Chs, Geometry};
use hybridboot_core::bytes::{is_zero, read_u32_le, write_u32_le};
use serde::Serialize;

/// Raw 16-byte partition table entry
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x0     1     Status (0x80 = bootable)
/// 0x1     3     First CHS
/// 0x4     1     Partition type
/// 0x5     3     Last CHS
/// 0x8     4     First LBA
/// 0xC     4     Sector count
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionRecord {
    pub status: u8,
    pub start_chs: [u8; 3],
    pub partition_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: u32,
    pub sectors: u32,
}

impl PartitionRecord {
    /// Size of a partition entry in bytes
    pub const SIZE: usize = 16;

    /// Status byte of a bootable entry
    pub const BOOTABLE: u8 = 0x80;

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            status: bytes[0],
            start_chs: [bytes[1], bytes[2], bytes[3]],
            partition_type: bytes[4],
            end_chs: [bytes[5], bytes[6], bytes[7]],
            start_lba: read_u32_le(bytes, 8),
            sectors: read_u32_le(bytes, 12),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.status;
        out[1..4].copy_from_slice(&self.start_chs);
        out[4] = self.partition_type;
        out[5..8].copy_from_slice(&self.end_chs);
        write_u32_le(&mut out, 8, self.start_lba);
        write_u32_le(&mut out, 12, self.sectors);
        out
    }

    /// Entry covering `sectors` sectors from `start_lba`, CHS taken from
    /// `start_lba` and `last_chs_lba`
    pub fn span(
        partition_type: u8,
        start_lba: u32,
        sectors: u32,
        last_chs_lba: u32,
        geometry: Geometry,
        no_chs: bool,
    ) -> Self {
        Self {
            status: 0,
            start_chs: offset_to_chs(start_lba, geometry, no_chs),
            partition_type,
            end_chs: offset_to_chs(last_chs_lba, geometry, no_chs),
            start_lba,
            sectors,
        }
    }

    /// GPT protective entry covering sector 1 to the end of the disk
    pub fn protective(total_sectors: u32, geometry: Geometry, no_chs: bool) -> Self {
        let last = total_sectors.wrapping_sub(1);
        Self::span(MbrPartitionType::GPT_PROTECTIVE, 1, last, last, geometry, no_chs)
    }

    pub fn bootable(mut self) -> Self {
        self.status = Self::BOOTABLE;
        self
    }
}

/// Well-known partition type ids
pub struct MbrPartitionType;

impl MbrPartitionType {
    pub const EMPTY: u8 = 0x00;
    pub const EXTENDED: u8 = 0x05;
    pub const EXTENDED_LBA: u8 = 0x0F;
    pub const NTFS_HIDDEN: u8 = 0x17;
    pub const GPT_PROTECTIVE: u8 = 0xEE;
    pub const EFI_SYSTEM: u8 = 0xEF;

    /// Does this type id point at another partition table?
    pub fn is_extended(id: u8) -> bool {
        id == Self::EXTENDED || id == Self::EXTENDED_LBA
    }

    /// Get a human-readable name for a partition type id
    pub fn name(id: u8) -> Option<&'static str> {
        let name = match id {
            0x00 => "empty",
            0x01 => "fat12",
            0x04 => "fat16 <32mb",
            0x05 => "extended",
            0x06 => "fat16",
            0x07 => "ntfs",
            0x0B => "fat32",
            0x0C => "fat32 lba",
            0x0E => "fat16 lba",
            0x0F => "extended lba",
            0x11 => "fat12 hidden",
            0x14 => "fat16 <32mb hidden",
            0x16 => "fat16 hidden",
            0x17 => "ntfs hidden",
            0x1B => "fat32 hidden",
            0x1C => "fat32 lba hidden",
            0x1E => "fat16 lba hidden",
            0x41 => "prep",
            0x82 => "swap",
            0x83 => "linux",
            0x8E => "lvm",
            0x96 => "chrp iso9660",
            0xDE => "dell utility",
            0xEE => "gpt",
            0xEF => "efi",
            0xFD => "linux raid",
            _ => return None,
        };
        Some(name)
    }
}

/// A decoded partition table entry with its addressing context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MbrEntry {
    /// Slot in its table, 0-3
    pub table_index: usize,
    pub boot: bool,
    pub partition_type: u8,
    pub start: Chs,
    /// First sector, relative to `base`
    pub start_lba: u32,
    pub end: Chs,
    /// Last sector, relative to `base`
    pub end_lba: u32,
    /// Sector of the table holding this entry
    pub table_lba: u32,
    /// Sector `start_lba` is relative to
    pub base: u32,
    pub valid: bool,
    /// All 16 bytes are zero
    pub empty: bool,
}

impl MbrEntry {
    /// Decode one entry of the table at `table_lba`
    ///
    /// Extended entries count from `ext_base`, everything else from the table
    /// itself. An entry whose status byte has bits other than 0x80 set keeps
    /// only its slot index, with every address zeroed, and is never valid.
    pub fn parse(raw: &[u8], table_index: usize, table_lba: u32, ext_base: u32) -> Self {
        let record = PartitionRecord::from_bytes(raw);

        let mut entry = Self {
            table_index,
            boot: false,
            partition_type: 0,
            start: Chs::default(),
            start_lba: 0,
            end: Chs::default(),
            end_lba: 0,
            table_lba,
            base: table_lba,
            valid: false,
            empty: is_zero(&raw[..PartitionRecord::SIZE]),
        };

        if record.status & 0x7F != 0 {
            entry.table_lba = 0;
            entry.base = 0;
            return entry;
        }

        entry.boot = record.status & PartitionRecord::BOOTABLE != 0;
        entry.partition_type = record.partition_type;
        entry.start = Chs::from_bytes(&record.start_chs);
        entry.end = Chs::from_bytes(&record.end_chs);
        entry.start_lba = record.start_lba;
        entry.end_lba = record.start_lba.wrapping_add(record.sectors);

        if entry.is_extended() {
            entry.base = ext_base;
        }

        if entry.end_lba != entry.start_lba && entry.start.sector != 0 && entry.end.sector != 0 {
            entry.valid = true;
            entry.end_lba = entry.end_lba.wrapping_sub(1);
        }

        entry
    }

    pub fn is_extended(&self) -> bool {
        MbrPartitionType::is_extended(self.partition_type)
    }

    /// Absolute first sector
    pub fn first_lba(&self) -> u64 {
        self.start_lba as u64 + self.base as u64
    }

    /// Absolute last sector
    pub fn last_lba(&self) -> u64 {
        self.end_lba as u64 + self.base as u64
    }

    /// Size in sectors
    pub fn size(&self) -> u64 {
        self.end_lba.wrapping_sub(self.start_lba) as u64 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_type_names() {
        assert_eq!(MbrPartitionType::name(0x00), Some("empty"));
        assert_eq!(MbrPartitionType::name(0x0C), Some("fat32 lba"));
        assert_eq!(MbrPartitionType::name(0xEE), Some("gpt"));
        assert_eq!(MbrPartitionType::name(0xEF), Some("efi"));
        assert_eq!(MbrPartitionType::name(0x42), None);
    }

    #[test]
    fn test_record_bytes() {
        let record = PartitionRecord {
            status: 0x80,
            start_chs: [0, 1, 0],
            partition_type: 0x17,
            end_chs: [63, 32 | 0xC0, 0xFF],
            start_lba: 0,
            sectors: 0x0016_0000,
        };
        let bytes = record.to_bytes();
        assert_eq!(bytes[0], 0x80);
        assert_eq!(bytes[4], 0x17);
        assert_eq!(&bytes[12..16], &[0x00, 0x00, 0x16, 0x00]);
        assert_eq!(PartitionRecord::from_bytes(&bytes), record);
    }

    #[test]
    fn test_protective_record() {
        let record = PartitionRecord::protective(22528, Geometry::new(64, 32), false);
        assert_eq!(record.partition_type, 0xEE);
        assert_eq!(record.start_lba, 1);
        assert_eq!(record.sectors, 22527);
        assert_eq!(record.start_chs, [0, 2, 0]);
        assert_eq!(record.status, 0);
    }

    #[test]
    fn test_parse_valid_entry() {
        let mut raw = [0u8; 16];
        raw[0] = 0x80;
        raw[1..4].copy_from_slice(&[0x00, 0x01, 0x00]);
        raw[4] = 0x83;
        raw[5..8].copy_from_slice(&[0x3F, 0x20, 0x09]);
        raw[8..12].copy_from_slice(&0u32.to_le_bytes());
        raw[12..16].copy_from_slice(&20480u32.to_le_bytes());

        let entry = MbrEntry::parse(&raw, 2, 0, 0);
        assert!(entry.valid);
        assert!(entry.boot);
        assert!(!entry.empty);
        assert_eq!(entry.table_index, 2);
        assert_eq!(entry.last_lba(), 20479);
        assert_eq!(entry.size(), 20480);
        assert_eq!(entry.end.cylinder, 9);
    }

    #[test]
    fn test_parse_zero_count_is_invalid() {
        let mut raw = [0u8; 16];
        raw[1..4].copy_from_slice(&[0x00, 0x01, 0x00]);
        raw[4] = 0x0C;
        raw[5..8].copy_from_slice(&[0x00, 0x01, 0x00]);
        let entry = MbrEntry::parse(&raw, 0, 0, 0);
        assert!(!entry.valid);
        assert!(!entry.empty);
    }

    #[test]
    fn test_parse_bad_status_keeps_slot_only() {
        let mut raw = [0u8; 16];
        raw[0] = 0x81;
        raw[4] = 0x83;
        raw[12] = 0x10;
        let entry = MbrEntry::parse(&raw, 1, 2048, 0);
        assert!(!entry.valid);
        assert!(!entry.empty);
        assert_eq!(entry.table_index, 1);
        assert_eq!(entry.partition_type, 0);
        assert_eq!((entry.table_lba, entry.base), (0, 0));
        assert_eq!((entry.start_lba, entry.end_lba), (0, 0));
    }

    #[test]
    fn test_extended_entry_uses_extension_base() {
        let mut raw = [0u8; 16];
        raw[1..4].copy_from_slice(&[0x00, 0x01, 0x00]);
        raw[4] = MbrPartitionType::EXTENDED;
        raw[5..8].copy_from_slice(&[0x00, 0x01, 0x00]);
        raw[8..12].copy_from_slice(&100u32.to_le_bytes());
        raw[12..16].copy_from_slice(&50u32.to_le_bytes());

        let extended = MbrEntry::parse(&raw, 1, 5000, 4000);
        assert_eq!(extended.base, 4000);
        assert_eq!(extended.first_lba(), 4100);

        raw[4] = 0x83;
        let logical = MbrEntry::parse(&raw, 0, 5000, 4000);
        assert_eq!(logical.base, 5000);
        assert_eq!(logical.first_lba(), 5100);
    }
}
