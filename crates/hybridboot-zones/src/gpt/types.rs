//! GPT partition types and structures

use hybridboot_core::bytes::{read_array16, read_u32_le, read_u64_le};
use hybridboot_core::{crc32, gpt_header_crc32, Guid};
use std::fmt;

/// GPT partition type GUID
///
/// Well-known partition type GUIDs used in GPT partition tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionTypeGuid(pub Guid);

impl PartitionTypeGuid {
    /// Unused entry
    pub const UNUSED: Self = Self(Guid::ZERO);

    /// EFI System Partition
    pub const EFI_SYSTEM: Self = Self(Guid::from_canonical([
        0xc1, 0x2a, 0x73, 0x28, 0xf8, 0x1f, 0x11, 0xd2,
        0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9, 0x3b,
    ]));

    /// Microsoft Basic Data (FAT, NTFS, exFAT), also used for the ISO data area
    pub const BASIC_DATA: Self = Self(Guid::from_canonical([
        0xeb, 0xd0, 0xa0, 0xa2, 0xb9, 0xe5, 0x44, 0x33,
        0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99, 0xc7,
    ]));

    /// Apple HFS+
    pub const HFS_PLUS: Self = Self(Guid::from_canonical([
        0x48, 0x46, 0x53, 0x00, 0x00, 0x00, 0x11, 0xaa,
        0xaa, 0x11, 0x00, 0x30, 0x65, 0x43, 0xec, 0xac,
    ]));

    /// Well-known types, by canonical GUID string
    const NAMES: [(&'static str, &'static str); 10] = [
        ("c12a7328-f81f-11d2-ba4b-00a0c93ec93b", "efi system"),
        ("0fc63daf-8483-4772-8e79-3d69d8477de4", "linux data"),
        ("e6d6d379-f507-44c2-a23c-238f2a3df928", "linux lvm"),
        ("a19d880f-05fc-4d3b-a006-743f0f84911e", "linux raid"),
        ("933ac7e1-2eb4-4f13-b844-0e14e2aef915", "linux home"),
        ("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f", "linux swap"),
        ("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7", "windows data"),
        ("48465300-0000-11aa-aa11-00306543ecac", "hfs+"),
        ("21686148-6449-6e6f-744e-656564454649", "bios boot"),
        ("9e1a2d38-c612-4316-aa26-8b49521e5a8b", "prep"),
    ];

    /// Get a human-readable name for this partition type
    pub fn name(&self) -> Option<&'static str> {
        let text = self.0.to_string();
        Self::NAMES
            .iter()
            .find(|(guid, _)| *guid == text)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for PartitionTypeGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// GPT partition entry
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    16    Partition type GUID
/// 0x10    16    Unique partition GUID
/// 0x20    8     First LBA
/// 0x28    8     Last LBA (inclusive)
/// 0x30    8     Attributes
/// 0x38    72    Name (UTF-16LE)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptPartitionEntry {
    pub partition_type_guid: PartitionTypeGuid,
    pub unique_partition_guid: Guid,
    pub first_lba: u64,
    pub last_lba: u64,
    pub attributes: u64,
    /// UTF-16 code units with trailing zero units removed
    pub name_units: Vec<u16>,
}

impl GptPartitionEntry {
    /// Size of a partition entry in bytes
    pub const ENTRY_SIZE: usize = 128;

    /// Offset of the name field
    pub const NAME_OFFSET: usize = 56;

    /// Name capacity of a 128-byte entry, in UTF-16 units
    pub const NAME_UNITS: usize = 36;

    /// Firmware must preserve the partition
    pub const ATTR_SYSTEM: u64 = 1 << 0;

    /// Hidden from the EFI firmware
    pub const ATTR_HIDDEN: u64 = 1 << 1;

    /// Legacy BIOS bootable
    pub const ATTR_LEGACY_BOOT: u64 = 1 << 2;

    /// Build an entry with a fresh random partition GUID
    pub fn new(
        partition_type_guid: PartitionTypeGuid,
        first_lba: u64,
        last_lba: u64,
        name: &str,
    ) -> Self {
        Self {
            partition_type_guid,
            unique_partition_guid: Guid::new_random(),
            first_lba,
            last_lba,
            attributes: 0,
            name_units: name.encode_utf16().take(Self::NAME_UNITS).collect(),
        }
    }

    /// Parse a partition entry of `bytes.len()` bytes
    ///
    /// The name field runs from offset 56 to the end of the entry.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut name_units: Vec<u16> = bytes[Self::NAME_OFFSET.min(bytes.len())..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        while name_units.last() == Some(&0) {
            name_units.pop();
        }

        Self {
            partition_type_guid: PartitionTypeGuid(Guid::from_disk(read_array16(bytes, 0))),
            unique_partition_guid: Guid::from_disk(read_array16(bytes, 16)),
            first_lba: read_u64_le(bytes, 32),
            last_lba: read_u64_le(bytes, 40),
            attributes: read_u64_le(bytes, 48),
            name_units,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::ENTRY_SIZE] {
        let mut out = [0u8; Self::ENTRY_SIZE];
        out[0..16].copy_from_slice(self.partition_type_guid.0.as_bytes());
        out[16..32].copy_from_slice(self.unique_partition_guid.as_bytes());
        out[32..40].copy_from_slice(&self.first_lba.to_le_bytes());
        out[40..48].copy_from_slice(&self.last_lba.to_le_bytes());
        out[48..56].copy_from_slice(&self.attributes.to_le_bytes());

        for (i, unit) in self.name_units.iter().take(Self::NAME_UNITS).enumerate() {
            let offset = Self::NAME_OFFSET + i * 2;
            out[offset..offset + 2].copy_from_slice(&unit.to_le_bytes());
        }
        out
    }

    /// Check if this entry is unused
    pub fn is_unused(&self) -> bool {
        self.partition_type_guid == PartitionTypeGuid::UNUSED
    }

    /// Get the size of this partition in LBA sectors
    pub fn size_lba(&self) -> u64 {
        self.last_lba.wrapping_sub(self.first_lba).wrapping_add(1)
    }

    pub fn name(&self) -> String {
        String::from_utf16_lossy(&self.name_units)
    }

    /// Name as `\uXXXX` escapes, one per code unit
    pub fn name_hex(&self) -> String {
        self.name_units.iter().map(|u| format!("\\u{:04x}", u)).collect()
    }
}

/// GPT header
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    8     Signature "EFI PART"
/// 0x08    4     Revision
/// 0x0C    4     Header size
/// 0x10    4     Header CRC32
/// 0x14    4     Reserved
/// 0x18    8     Current LBA
/// 0x20    8     Backup LBA
/// 0x28    8     First usable LBA
/// 0x30    8     Last usable LBA
/// 0x38    16    Disk GUID
/// 0x48    8     Partition entries LBA
/// 0x50    4     Number of partition entries
/// 0x54    4     Size of a partition entry
/// 0x58    4     Partition entries CRC32
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptHeader {
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub reserved: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Guid,
    pub partition_entries_lba: u64,
    pub num_partition_entries: u32,
    pub partition_entry_size: u32,
    pub partition_entries_crc32: u32,
}

impl GptHeader {
    /// GPT header signature
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Typical GPT header size
    pub const HEADER_SIZE: usize = 92;

    /// Revision 1.0
    pub const REVISION_1_0: u32 = 0x0001_0000;

    /// Entry count written by the builder
    pub const ENTRY_COUNT: u32 = 128;

    /// Parse GPT header from bytes; `None` without the signature
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::HEADER_SIZE || &bytes[0..8] != Self::SIGNATURE {
            return None;
        }

        Some(Self {
            revision: read_u32_le(bytes, 8),
            header_size: read_u32_le(bytes, 12),
            header_crc32: read_u32_le(bytes, 16),
            reserved: read_u32_le(bytes, 20),
            current_lba: read_u64_le(bytes, 24),
            backup_lba: read_u64_le(bytes, 32),
            first_usable_lba: read_u64_le(bytes, 40),
            last_usable_lba: read_u64_le(bytes, 48),
            disk_guid: Guid::from_disk(read_array16(bytes, 56)),
            partition_entries_lba: read_u64_le(bytes, 72),
            num_partition_entries: read_u32_le(bytes, 80),
            partition_entry_size: read_u32_le(bytes, 84),
            partition_entries_crc32: read_u32_le(bytes, 88),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::HEADER_SIZE] {
        let mut out = [0u8; Self::HEADER_SIZE];
        out[0..8].copy_from_slice(Self::SIGNATURE);
        out[8..12].copy_from_slice(&self.revision.to_le_bytes());
        out[12..16].copy_from_slice(&self.header_size.to_le_bytes());
        out[16..20].copy_from_slice(&self.header_crc32.to_le_bytes());
        out[20..24].copy_from_slice(&self.reserved.to_le_bytes());
        out[24..32].copy_from_slice(&self.current_lba.to_le_bytes());
        out[32..40].copy_from_slice(&self.backup_lba.to_le_bytes());
        out[40..48].copy_from_slice(&self.first_usable_lba.to_le_bytes());
        out[48..56].copy_from_slice(&self.last_usable_lba.to_le_bytes());
        out[56..72].copy_from_slice(self.disk_guid.as_bytes());
        out[72..80].copy_from_slice(&self.partition_entries_lba.to_le_bytes());
        out[80..84].copy_from_slice(&self.num_partition_entries.to_le_bytes());
        out[84..88].copy_from_slice(&self.partition_entry_size.to_le_bytes());
        out[88..92].copy_from_slice(&self.partition_entries_crc32.to_le_bytes());
        out
    }

    /// Revision as `major.minor`
    pub fn revision_string(&self) -> String {
        format!("{}.{}", self.revision >> 16, self.revision & 0xFFFF)
    }

    /// Bytes covered by the partition array
    pub fn array_bytes(&self) -> u64 {
        self.num_partition_entries as u64 * self.partition_entry_size as u64
    }

    /// CRC32 of the header as stored in `raw`, CRC field counted as zero
    ///
    /// `header_size` is clamped to the bytes available.
    pub fn calculate_header_crc32(&self, raw: &[u8]) -> u32 {
        let size = (self.header_size as usize).min(raw.len());
        gpt_header_crc32(raw, size).unwrap_or(0)
    }

    /// Set both CRCs for `array`, the array CRC first
    pub fn seal(&mut self, array: &[u8]) {
        self.partition_entries_crc32 = crc32(array);
        self.header_crc32 = 0;
        let size = (self.header_size as usize).min(Self::HEADER_SIZE);
        self.header_crc32 = crc32(&self.to_bytes()[..size]);
    }
}
