//! Apple partition map entry

use hybridboot_core::bytes::{
    c_string, read_u16_be, read_u32_be, write_c_string, write_u16_be, write_u32_be,
};

/// Apple partition map entry
///
/// All integers are big-endian.
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x00    2     Signature "PM"
/// 0x02    2     Reserved
/// 0x04    4     Number of map entries
/// 0x08    4     First block
/// 0x0C    4     Block count
/// 0x10    32    Name
/// 0x30    32    Type
/// 0x50    4     Data start (relative)
/// 0x54    4     Data block count
/// 0x58    4     Status
/// 0x5C    28    Boot code location, size, load and entry addresses, checksum
/// 0x78    16    Processor
/// 0x88    4     Driver signature
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApmEntry {
    pub map_count: u32,
    pub start_block: u32,
    pub block_count: u32,
    pub name: String,
    pub partition_type: String,
    pub data_start: u32,
    pub data_count: u32,
    pub status: u32,
    pub boot_start: u32,
    pub boot_size: u32,
    pub boot_load: u32,
    pub boot_load2: u32,
    pub boot_entry: u32,
    pub boot_entry2: u32,
    pub boot_checksum: u32,
    pub processor: String,
    pub driver_signature: u32,
}

impl ApmEntry {
    /// Entry signature, "PM"
    pub const SIGNATURE: u16 = 0x504D;

    /// Bytes of an entry
    pub const SIZE: usize = 512;

    /// Signature check on raw bytes
    pub fn has_signature(bytes: &[u8]) -> bool {
        bytes.len() >= 2 && read_u16_be(bytes, 0) == Self::SIGNATURE
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            map_count: read_u32_be(bytes, 4),
            start_block: read_u32_be(bytes, 8),
            block_count: read_u32_be(bytes, 12),
            name: c_string(&bytes[16..48]),
            partition_type: c_string(&bytes[48..80]),
            data_start: read_u32_be(bytes, 80),
            data_count: read_u32_be(bytes, 84),
            status: read_u32_be(bytes, 88),
            boot_start: read_u32_be(bytes, 92),
            boot_size: read_u32_be(bytes, 96),
            boot_load: read_u32_be(bytes, 100),
            boot_load2: read_u32_be(bytes, 104),
            boot_entry: read_u32_be(bytes, 108),
            boot_entry2: read_u32_be(bytes, 112),
            boot_checksum: read_u32_be(bytes, 116),
            processor: c_string(&bytes[120..136]),
            driver_signature: read_u32_be(bytes, 136),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        write_u16_be(&mut out, 0, Self::SIGNATURE);
        let words = [
            (4, self.map_count),
            (8, self.start_block),
            (12, self.block_count),
            (80, self.data_start),
            (84, self.data_count),
            (88, self.status),
            (92, self.boot_start),
            (96, self.boot_size),
            (100, self.boot_load),
            (104, self.boot_load2),
            (108, self.boot_entry),
            (112, self.boot_entry2),
            (116, self.boot_checksum),
            (136, self.driver_signature),
        ];
        for (offset, value) in words {
            write_u32_be(&mut out, offset, value);
        }
        write_c_string(&mut out[16..48], &self.name);
        write_c_string(&mut out[48..80], &self.partition_type);
        write_c_string(&mut out[120..136], &self.processor);
        out
    }

    /// Last block, inclusive
    pub fn last_block(&self) -> u64 {
        (self.start_block as u64 + self.block_count as u64).wrapping_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_layout_is_big_endian() {
        let entry = ApmEntry {
            map_count: 3,
            start_block: 1,
            block_count: 0x10,
            name: "Apple".into(),
            partition_type: "Apple_partition_map".into(),
            data_count: 10,
            status: 3,
            ..Default::default()
        };
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[0..2], b"PM");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 3]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0x10]);
        assert_eq!(&bytes[16..22], b"Apple\0");
        assert_eq!(&bytes[48..67], b"Apple_partition_map");
        assert_eq!(&bytes[88..92], &[0, 0, 0, 3]);

        assert!(ApmEntry::has_signature(&bytes));
        assert_eq!(ApmEntry::from_bytes(&bytes), entry);
        assert_eq!(entry.last_block(), 16);
    }

    #[test]
    fn test_missing_signature() {
        assert!(!ApmEntry::has_signature(&[0u8; 512]));
        assert!(!ApmEntry::has_signature(&[0x50]));
    }
}
