//! APM (Apple Partition Map) implementation
//!
//! Hybrid images keep the map in 2048-byte slots starting at byte 2048, so a
//! Mac reading 2048-byte blocks finds entry 1 at block 1.

pub mod types;

use hybridboot_core::{BootImage, Result, Zone, ZoneTable, PROBE_BLOCK_SIZES};
use hybridboot_pipeline::Disk;
use serde::Serialize;
use types::ApmEntry;

/// One decoded map entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApmPartition {
    pub index: u32,
    pub number: u32,
    pub first_lba: u64,
    pub last_lba: u64,
    pub size: u64,
    pub data_start: u32,
    pub data_size: u32,
    pub status: u32,
    #[serde(rename = "type")]
    pub partition_type: String,
    pub name: String,
}

impl ApmPartition {
    fn new(number: u32, entry: &ApmEntry) -> Self {
        Self {
            index: number,
            number,
            first_lba: entry.start_block as u64,
            last_lba: entry.last_block(),
            size: entry.block_count as u64,
            data_start: entry.data_start,
            data_size: entry.data_count,
            status: entry.status,
            partition_type: entry.partition_type.clone(),
            name: entry.name.clone(),
        }
    }
}

/// Apple partition map
///
/// # Structure
///
/// ```text
/// Block 0:    Driver descriptor (shares the MBR sector in hybrids)
/// Block 1:    Entry 1, normally the map itself
/// Block 2..n: Further entries, one per block
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApmMap {
    pub block_size: u32,
    /// Entry count claimed by entry 1
    pub entries: u32,
    pub partitions: Vec<ApmPartition>,
    #[serde(skip)]
    zones: Vec<Zone>,
}

impl ApmMap {
    /// Byte offset of the map in a hybrid image
    pub const OFFSET: u64 = 2048;

    /// Bytes per map slot in a hybrid image
    pub const SLOT_SIZE: usize = 2048;

    /// Entries the builder writes
    pub const ENTRY_COUNT: u32 = 3;

    /// Look for a map at block 1 under each candidate block size
    ///
    /// The first block size with a signature wins. Entries are read up to the
    /// claimed count, clamped to the blocks the disk has; reading stops at the
    /// first read error. The disk's block size is restored afterwards.
    pub fn decode(disk: &mut Disk) -> Result<Option<Self>> {
        let original = disk.block_size();
        let mut found = None;

        for block_size in PROBE_BLOCK_SIZES {
            if disk.set_block_size(block_size).is_err() {
                continue;
            }
            if let Some(map) = Self::decode_at_block_size(disk) {
                found = Some(map);
                break;
            }
        }

        disk.set_block_size(original)?;
        Ok(found)
    }

    fn decode_at_block_size(disk: &mut Disk) -> Option<Self> {
        let first = disk.read(1, 1).ok()?;
        if !ApmEntry::has_signature(&first) {
            return None;
        }

        let block_size = disk.block_size();
        let entries = ApmEntry::from_bytes(&first).map_count;
        let limit = entries.min(disk.block_count().saturating_sub(1).min(u32::MAX as u64) as u32);
        if limit < entries {
            tracing::warn!(
                "{}: apm claims {} entries, disk holds {}",
                disk.name(),
                entries,
                limit
            );
        }

        let mut partitions = Vec::new();
        for number in 1..=limit {
            let block = match disk.read(number as u64, 1) {
                Ok(block) => block,
                Err(e) => {
                    tracing::warn!("{}: apm entry {}: {}", disk.name(), number, e);
                    break;
                }
            };
            partitions.push(ApmPartition::new(number, &ApmEntry::from_bytes(&block)));
        }

        let zones = partitions
            .iter()
            .map(|p| {
                Zone::new(
                    p.number as usize,
                    p.first_lba * block_size as u64,
                    p.size * block_size as u64,
                    p.partition_type.clone(),
                )
            })
            .collect();

        tracing::info!(
            "{}: apple partition map (block size {}), {} entries",
            disk.name(),
            block_size,
            entries
        );

        Some(Self {
            block_size,
            entries,
            partitions,
            zones,
        })
    }

    /// The three 2048-byte slots a hybrid image carries at byte 2048
    ///
    /// Slot 0 describes the map, slot 1 the EFI image, slot 2 the Mac image or,
    /// without one, the free space between the map and the EFI image. Start
    /// blocks and counts are taken from the catalog as they are.
    pub fn encode_hybrid(efi: BootImage, mac: Option<BootImage>) -> Vec<u8> {
        let map = ApmEntry {
            map_count: Self::ENTRY_COUNT,
            start_block: 1,
            block_count: 0x10,
            name: "Apple".into(),
            partition_type: "Apple_partition_map".into(),
            data_start: 0,
            data_count: 10,
            status: 0x03,
            ..Default::default()
        };

        let efi_entry = hfs_entry(efi);

        let last = match mac {
            Some(mac) => hfs_entry(mac),
            None => {
                let start = (Self::OFFSET / Self::SLOT_SIZE as u64) as u32 + 10;
                let count = efi.lba.wrapping_sub(start);
                ApmEntry {
                    map_count: Self::ENTRY_COUNT,
                    start_block: start,
                    block_count: count,
                    name: "ISO".into(),
                    partition_type: "Apple_Free".into(),
                    data_start: 0,
                    data_count: count,
                    status: 0x01,
                    ..Default::default()
                }
            }
        };

        let mut out = vec![0u8; Self::ENTRY_COUNT as usize * Self::SLOT_SIZE];
        for (i, entry) in [map, efi_entry, last].iter().enumerate() {
            let offset = i * Self::SLOT_SIZE;
            out[offset..offset + ApmEntry::SIZE].copy_from_slice(&entry.to_bytes());
        }
        out
    }
}

fn hfs_entry(image: BootImage) -> ApmEntry {
    ApmEntry {
        map_count: ApmMap::ENTRY_COUNT,
        start_block: image.lba,
        block_count: image.sectors,
        name: "EFI".into(),
        partition_type: "Apple_HFS".into(),
        data_start: 0,
        data_count: image.sectors,
        status: 0x33,
        ..Default::default()
    }
}

impl ZoneTable for ApmMap {
    fn identify(&self) -> &str {
        "Apple Partition Map"
    }

    fn enumerate_zones(&self) -> &[Zone] {
        &self.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_with_map(map: &[u8]) -> Disk {
        let mut disk = Disk::synthetic("apm", 10 * 1024 * 1024);
        for (i, chunk) in map.chunks(512).enumerate() {
            disk.store_chunk(ApmMap::OFFSET / 512 + i as u64, chunk.to_vec());
        }
        disk
    }

    #[test]
    fn test_hybrid_map_without_mac_image() {
        let efi = BootImage {
            lba: 30,
            sectors: 64,
        };
        let map = ApmMap::encode_hybrid(efi, None);
        assert_eq!(map.len(), 3 * 2048);

        let mut disk = disk_with_map(&map);
        let decoded = ApmMap::decode(&mut disk).unwrap().unwrap();

        assert_eq!(decoded.identify(), "Apple Partition Map");
        assert_eq!(decoded.block_size, 2048);
        assert_eq!(decoded.entries, 3);
        assert_eq!(disk.block_size(), 512);

        let types: Vec<&str> = decoded
            .partitions
            .iter()
            .map(|p| p.partition_type.as_str())
            .collect();
        assert_eq!(types, vec!["Apple_partition_map", "Apple_HFS", "Apple_Free"]);

        let efi_part = &decoded.partitions[1];
        assert_eq!(efi_part.name, "EFI");
        assert_eq!(efi_part.first_lba, 30);
        assert_eq!(efi_part.last_lba, 93);
        assert_eq!(efi_part.status, 0x33);

        let free = &decoded.partitions[2];
        assert_eq!(free.first_lba, 11);
        assert_eq!(free.size, 19);
        assert_eq!(free.status, 1);

        assert_eq!(decoded.enumerate_zones()[1].offset, 30 * 2048);
    }

    #[test]
    fn test_hybrid_map_with_mac_image() {
        let map = ApmMap::encode_hybrid(
            BootImage {
                lba: 30,
                sectors: 64,
            },
            Some(BootImage {
                lba: 50,
                sectors: 128,
            }),
        );
        let mut disk = disk_with_map(&map);
        let decoded = ApmMap::decode(&mut disk).unwrap().unwrap();

        let mac = &decoded.partitions[2];
        assert_eq!(mac.partition_type, "Apple_HFS");
        assert_eq!(mac.first_lba, 50);
        assert_eq!(mac.data_size, 128);
    }

    #[test]
    fn test_entry_count_clamped_to_disk() {
        let mut entry = ApmEntry::from_bytes(&[0u8; 512]);
        entry.map_count = 1_000_000;
        entry.block_count = 1;
        let mut disk = Disk::synthetic("apm", 8 * 512);
        disk.store_chunk(1, entry.to_bytes().to_vec());

        let decoded = ApmMap::decode(&mut disk).unwrap().unwrap();
        assert_eq!(decoded.block_size, 512);
        assert_eq!(decoded.entries, 1_000_000);
        assert_eq!(decoded.partitions.len(), 7);
    }

    #[test]
    fn test_no_map() {
        let mut disk = Disk::synthetic("blank", 1024 * 1024);
        assert!(ApmMap::decode(&mut disk).unwrap().is_none());
    }
}
