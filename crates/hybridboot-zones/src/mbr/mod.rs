//! MBR (Master Boot Record) partition table implementation

pub mod types;

use crate::geometry::{guess_geometry, Geometry};
use hybridboot_core::bytes::{
    contains, is_zero, read_u16_le, read_u32_le, read_u64_le, write_u16_le, write_u32_le,
    write_u64_le,
};
use hybridboot_core::{NameResolver, Result, Zone, ZoneTable, MAX_EXTENDED_CHAIN_LINKS};
use hybridboot_pipeline::Disk;
use serde::Serialize;
use types::{MbrEntry, MbrPartitionType, PartitionRecord};

/// How a boot-info pointer at byte 432 was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BootInfoKind {
    /// Sector mentions `isolinux.bin`
    Isolinux,
    /// Sector mentions `GRUB`; the stored value points 4 sectors past the image
    Grub,
    /// Anything else
    Bootinfo,
}

impl BootInfoKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Isolinux => "isolinux",
            Self::Grub => "grub",
            Self::Bootinfo => "bootinfo",
        }
    }
}

/// The 64-bit boot image pointer some loaders keep in the MBR
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootInfo {
    pub kind: BootInfoKind,
    /// In 512-byte sectors
    pub first_lba: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// How the extended partition chain walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChainStatus {
    /// No further extended entry
    Complete,
    /// Stopped after [`MAX_EXTENDED_CHAIN_LINKS`] tables
    TooManyPartitions,
    /// A chained table could not be read or had no boot signature
    InvalidExtended { table_lba: u64, read_error: bool },
}

/// One reported partition table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MbrPartition {
    /// 1-4 for primary entries, 5 and up in the extended chain
    pub number: u32,
    #[serde(flatten)]
    pub entry: MbrEntry,
    pub first_lba: u64,
    pub last_lba: u64,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<&'static str>,
}

impl MbrPartition {
    fn new(number: u32, entry: &MbrEntry) -> Self {
        let (first_lba, last_lba, size) = if entry.valid {
            (entry.first_lba(), entry.last_lba(), entry.size())
        } else {
            (0, 0, 0)
        };

        Self {
            number,
            entry: entry.clone(),
            first_lba,
            last_lba,
            size,
            type_name: if entry.valid {
                MbrPartitionType::name(entry.partition_type)
            } else {
                None
            },
        }
    }

    /// A link in the extended chain rather than a partition
    pub fn is_chain_link(&self) -> bool {
        self.number > 4 && self.entry.is_extended()
    }
}

/// MBR partition table
///
/// The Master Boot Record is the traditional partitioning scheme used by BIOS-based systems.
/// It supports up to 4 primary partitions, or 3 primary partitions and 1 extended partition.
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x000   432   Bootstrap code
/// 0x1B0   8     Boot image pointer (isolinux, GRUB)
/// 0x1B8   4     Disk signature
/// 0x1BC   2     Reserved
/// 0x1BE   16    Partition entry 1
/// 0x1CE   16    Partition entry 2
/// 0x1DE   16    Partition entry 3
/// 0x1EE   16    Partition entry 4
/// 0x1FE   2     Boot signature (0xAA55)
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct MbrTable {
    pub disk_id: u32,
    pub block_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_info: Option<BootInfo>,
    pub geometry: Geometry,
    pub cylinders: u64,
    pub geometry_consistent: bool,
    pub partitions: Vec<MbrPartition>,
    pub chain: ChainStatus,
    #[serde(skip)]
    zones: Vec<Zone>,
}

impl MbrTable {
    /// The boot signature that must be present at offset 0x1FE
    pub const BOOT_SIGNATURE: u16 = 0xAA55;

    /// Size of the MBR in bytes (always 512)
    pub const MBR_SIZE: usize = 512;

    /// Size of the boot code area
    pub const BOOT_CODE_SIZE: usize = 432;

    /// Offset of the boot image pointer
    pub const BOOT_INFO_OFFSET: usize = 0x1B0;

    /// Offset of the disk signature
    pub const DISK_SIGNATURE_OFFSET: usize = 0x1B8;

    /// Offset of the first partition entry
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the boot signature
    pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

    /// Number of partition entries in MBR
    pub const NUM_PARTITIONS: usize = 4;

    /// Decode the MBR in block 0 and follow its extended chain
    ///
    /// Returns `None` when block 0 has no boot signature, or when the entry
    /// area and the disk id are all zero. Problems further down the chain are
    /// recorded in [`MbrTable::chain`]; only a failure to read block 0 is an
    /// error.
    pub fn decode(disk: &mut Disk, names: &mut dyn NameResolver) -> Result<Option<Self>> {
        let block_size = disk.block_size();
        let sector = disk.read(0, 1)?;

        if read_u16_le(&sector, Self::BOOT_SIGNATURE_OFFSET) != Self::BOOT_SIGNATURE {
            tracing::debug!("{}: no mbr boot signature", disk.name());
            return Ok(None);
        }

        let disk_id = read_u32_le(&sector, Self::DISK_SIGNATURE_OFFSET);
        if disk_id == 0 && is_zero(&sector[Self::PARTITION_TABLE_OFFSET..Self::BOOT_SIGNATURE_OFFSET])
        {
            tracing::debug!("{}: empty mbr", disk.name());
            return Ok(None);
        }

        let primary = parse_table(&sector, 0, 0);

        let guess = guess_geometry(&primary);
        if !guess.consistent {
            tracing::warn!(
                "{}: inconsistent mbr geometry, assuming {}",
                disk.name(),
                guess.geometry
            );
        }
        let cylinder_bytes = block_size as u64 * guess.geometry.cylinder_sectors();
        let cylinders = disk.size_in_bytes() / cylinder_bytes;

        let boot_info = boot_info(&sector, names);

        let mut partitions = Vec::new();
        for (i, entry) in primary.iter().enumerate() {
            push_partition(&mut partitions, i as u32 + 1, entry);
        }

        let chain = walk_chain(disk, &primary, &mut partitions);

        let zones = partitions
            .iter()
            .filter(|p| p.entry.valid && !p.entry.is_extended())
            .map(|p| {
                let type_name = p
                    .type_name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("0x{:02x}", p.entry.partition_type));
                Zone::new(
                    p.number as usize,
                    p.first_lba * block_size as u64,
                    p.size * block_size as u64,
                    type_name,
                )
            })
            .collect();

        tracing::info!(
            "{}: mbr id 0x{:08x}, {} entries",
            disk.name(),
            disk_id,
            partitions.len()
        );

        Ok(Some(Self {
            disk_id,
            block_size,
            boot_info,
            geometry: guess.geometry,
            cylinders,
            geometry_consistent: guess.consistent,
            partitions,
            chain,
            zones,
        }))
    }

    /// Check if this MBR contains a GPT protective partition
    pub fn is_gpt_protective(&self) -> bool {
        self.partitions
            .iter()
            .any(|p| p.entry.valid && p.entry.partition_type == MbrPartitionType::GPT_PROTECTIVE)
    }
}

impl ZoneTable for MbrTable {
    fn identify(&self) -> &str {
        "Master Boot Record"
    }

    fn enumerate_zones(&self) -> &[Zone] {
        &self.zones
    }
}

/// Decode the four entries of the table in `sector`
fn parse_table(sector: &[u8], table_lba: u32, ext_base: u32) -> Vec<MbrEntry> {
    (0..MbrTable::NUM_PARTITIONS)
        .map(|i| {
            let offset = MbrTable::PARTITION_TABLE_OFFSET + i * PartitionRecord::SIZE;
            MbrEntry::parse(
                &sector[offset..offset + PartitionRecord::SIZE],
                i,
                table_lba,
                ext_base,
            )
        })
        .collect()
}

fn push_partition(partitions: &mut Vec<MbrPartition>, number: u32, entry: &MbrEntry) {
    if entry.valid || !entry.empty {
        partitions.push(MbrPartition::new(number, entry));
    }
}

/// Follow extended entries from `primary`, appending logical partitions
fn walk_chain(disk: &mut Disk, primary: &[MbrEntry], partitions: &mut Vec<MbrPartition>) -> ChainStatus {
    let mut table = primary.to_vec();
    let mut number = 5u32;
    let mut links = 0u32;
    let mut ext_base = 0u32;

    while let Some(link) = table.iter().find(|e| e.valid && e.is_extended()).cloned() {
        links += 1;
        if links == 1 {
            ext_base = link.start_lba;
        }

        if links > MAX_EXTENDED_CHAIN_LINKS {
            tracing::warn!("{}: too many partitions", disk.name());
            return ChainStatus::TooManyPartitions;
        }

        let table_lba = link.start_lba.wrapping_add(link.base);
        let sector = match disk.read(table_lba as u64, 1) {
            Ok(sector) => sector,
            Err(e) => {
                tracing::warn!(
                    "{}: disk read error - not a valid extended partition at {}: {}",
                    disk.name(),
                    table_lba,
                    e
                );
                return ChainStatus::InvalidExtended {
                    table_lba: table_lba as u64,
                    read_error: true,
                };
            }
        };

        if read_u16_le(&sector, MbrTable::BOOT_SIGNATURE_OFFSET) != MbrTable::BOOT_SIGNATURE {
            tracing::warn!(
                "{}: not a valid extended partition at {}",
                disk.name(),
                table_lba
            );
            return ChainStatus::InvalidExtended {
                table_lba: table_lba as u64,
                read_error: false,
            };
        }

        table = parse_table(&sector, table_lba, ext_base);
        for entry in &table {
            push_partition(partitions, number, entry);
            if entry.valid && !entry.is_extended() {
                number += 1;
            }
        }
    }

    ChainStatus::Complete
}

/// Classify the boot image pointer at byte 432
fn boot_info(sector: &[u8], names: &mut dyn NameResolver) -> Option<BootInfo> {
    let mut first_lba = read_u64_le(sector, MbrTable::BOOT_INFO_OFFSET);
    if first_lba == 0 {
        return None;
    }

    let kind = if contains(sector, b"isolinux.bin") {
        BootInfoKind::Isolinux
    } else if contains(sector, b"GRUB") {
        first_lba = first_lba.wrapping_sub(4);
        BootInfoKind::Grub
    } else {
        BootInfoKind::Bootinfo
    };

    Some(BootInfo {
        kind,
        first_lba,
        file_name: names.block_to_name(first_lba),
    })
}

/// An MBR sector to be written
///
/// `to_bytes` lays out the boot code, the optional Apple driver descriptor
/// header over its first 32 bytes, the boot image pointer, disk id, four
/// entries and the boot signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MbrSector {
    pub boot_code: [u8; MbrTable::BOOT_CODE_SIZE],
    pub apple_header: bool,
    /// Written at 432 unless `None`
    pub catalog_pointer: Option<u64>,
    pub disk_id: u32,
    pub partitions: [PartitionRecord; 4],
}

impl MbrSector {
    /// Apple driver descriptor map signature and branch, laid over the boot code
    pub const APPLE_DRIVER_HEADER: [u8; 32] = [
        0x45, 0x52, 0x08, 0x00, 0x00, 0x00, 0x90, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ];

    pub fn new(disk_id: u32) -> Self {
        Self {
            boot_code: [0u8; MbrTable::BOOT_CODE_SIZE],
            apple_header: false,
            catalog_pointer: None,
            disk_id,
            partitions: [PartitionRecord::default(); 4],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut boot_code = [0u8; MbrTable::BOOT_CODE_SIZE];
        boot_code.copy_from_slice(&bytes[..MbrTable::BOOT_CODE_SIZE]);

        let pointer = read_u64_le(bytes, MbrTable::BOOT_INFO_OFFSET);
        let partitions = core::array::from_fn(|i| {
            let offset = MbrTable::PARTITION_TABLE_OFFSET + i * PartitionRecord::SIZE;
            PartitionRecord::from_bytes(&bytes[offset..offset + PartitionRecord::SIZE])
        });

        Self {
            boot_code,
            apple_header: bytes[..32] == Self::APPLE_DRIVER_HEADER,
            catalog_pointer: (pointer != 0).then_some(pointer),
            disk_id: read_u32_le(bytes, MbrTable::DISK_SIGNATURE_OFFSET),
            partitions,
        }
    }

    pub fn to_bytes(&self) -> [u8; MbrTable::MBR_SIZE] {
        let mut out = [0u8; MbrTable::MBR_SIZE];
        out[..MbrTable::BOOT_CODE_SIZE].copy_from_slice(&self.boot_code);

        if self.apple_header {
            out[..32].copy_from_slice(&Self::APPLE_DRIVER_HEADER);
        }

        if let Some(pointer) = self.catalog_pointer {
            write_u64_le(&mut out, MbrTable::BOOT_INFO_OFFSET, pointer);
        }

        write_u32_le(&mut out, MbrTable::DISK_SIGNATURE_OFFSET, self.disk_id);

        for (i, record) in self.partitions.iter().enumerate() {
            let offset = MbrTable::PARTITION_TABLE_OFFSET + i * PartitionRecord::SIZE;
            out[offset..offset + PartitionRecord::SIZE].copy_from_slice(&record.to_bytes());
        }

        write_u16_le(&mut out, MbrTable::BOOT_SIGNATURE_OFFSET, MbrTable::BOOT_SIGNATURE);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::offset_to_chs;
    use hybridboot_core::NoNames;

    struct FixedNames;

    impl NameResolver for FixedNames {
        fn block_to_name(&mut self, block: u64) -> Option<String> {
            (block == 84).then(|| "/isolinux/isolinux.bin".to_string())
        }
    }

    fn record(partition_type: u8, start_lba: u32, sectors: u32) -> PartitionRecord {
        PartitionRecord {
            status: 0,
            start_chs: [0, 1, 0],
            partition_type,
            end_chs: [0, 1, 0],
            start_lba,
            sectors,
        }
    }

    fn table_sector(records: &[PartitionRecord]) -> Vec<u8> {
        let mut sector = MbrSector::new(0);
        for (slot, rec) in sector.partitions.iter_mut().zip(records) {
            *slot = *rec;
        }
        sector.to_bytes().to_vec()
    }

    fn disk_with(sectors: &[(u64, Vec<u8>)]) -> Disk {
        let mut disk = Disk::synthetic("test", 64 * 1024 * 1024);
        for (lba, data) in sectors {
            disk.store_chunk(*lba, data.clone());
        }
        disk
    }

    /// Create a minimal valid MBR with one partition
    fn create_test_mbr() -> Vec<u8> {
        let geometry = Geometry::new(64, 32);
        let mut sector = MbrSector::new(0x7856_3412);
        sector.partitions[0] = PartitionRecord::span(0x0C, 2048, 2048, 4095, geometry, false).bootable();
        sector.to_bytes().to_vec()
    }

    #[test]
    fn test_parse_valid_mbr() {
        let mut disk = disk_with(&[(0, create_test_mbr())]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();

        assert_eq!(table.identify(), "Master Boot Record");
        assert_eq!(table.disk_id, 0x7856_3412);
        assert_eq!(table.partitions.len(), 1);
        assert_eq!(table.chain, ChainStatus::Complete);
        assert!(table.geometry_consistent);
        assert_eq!(table.geometry, Geometry::new(64, 32));
        assert_eq!(table.cylinders, 64);
        assert!(table.boot_info.is_none());

        let zones = table.enumerate_zones();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].index, 1);
        assert_eq!(zones[0].offset, 2048 * 512);
        assert_eq!(zones[0].length, 2048 * 512);
        assert_eq!(zones[0].zone_type, "fat32 lba");

        let p = &table.partitions[0];
        assert!(p.entry.boot);
        assert_eq!(p.first_lba, 2048);
        assert_eq!(p.last_lba, 4095);
    }

    #[test]
    fn test_parse_invalid_boot_signature() {
        let mut mbr = create_test_mbr();
        mbr[0x1FE] = 0x00;
        let mut disk = disk_with(&[(0, mbr)]);
        assert!(MbrTable::decode(&mut disk, &mut NoNames).unwrap().is_none());
    }

    #[test]
    fn test_parse_empty_mbr() {
        let mut disk = disk_with(&[(0, table_sector(&[]))]);
        assert!(MbrTable::decode(&mut disk, &mut NoNames).unwrap().is_none());

        // a disk id alone makes the table present
        let mut sector = MbrSector::new(1);
        sector.boot_code[0] = 0xEB;
        let mut disk = disk_with(&[(0, sector.to_bytes().to_vec())]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();
        assert!(table.partitions.is_empty());
        assert!(!table.geometry_consistent);
        assert_eq!(table.geometry, Geometry::FALLBACK);
    }

    #[test]
    fn test_invalid_entry_reported() {
        let mut mbr = create_test_mbr();
        mbr[0x1CE] = 0x01;
        mbr[0x1CE + 4] = 0x83;
        let mut disk = disk_with(&[(0, mbr)]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();

        assert_eq!(table.partitions.len(), 2);
        assert!(!table.partitions[1].entry.valid);
        assert_eq!(table.partitions[1].number, 2);
        assert_eq!(table.enumerate_zones().len(), 1);
    }

    #[test]
    fn test_three_level_chain_numbers_logicals() {
        let primary = table_sector(&[
            record(0x83, 2048, 1000),
            record(MbrPartitionType::EXTENDED, 10_000, 100_000),
        ]);
        let ebr1 = table_sector(&[
            record(0x83, 63, 1000),
            record(MbrPartitionType::EXTENDED, 2000, 5000),
        ]);
        let ebr2 = table_sector(&[
            record(0x07, 63, 500),
            record(MbrPartitionType::EXTENDED_LBA, 4000, 5000),
        ]);
        let ebr3 = table_sector(&[record(0x82, 63, 200)]);

        let mut disk = disk_with(&[(0, primary), (10_000, ebr1), (12_000, ebr2), (14_000, ebr3)]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();
        assert_eq!(table.chain, ChainStatus::Complete);

        let logical: Vec<(u32, u64)> = table
            .partitions
            .iter()
            .filter(|p| p.number > 4 && !p.is_chain_link())
            .map(|p| (p.number, p.first_lba))
            .collect();
        assert_eq!(logical, vec![(5, 10_063), (6, 12_063), (7, 14_063)]);

        let links: Vec<u64> = table
            .partitions
            .iter()
            .filter(|p| p.is_chain_link())
            .map(|p| p.first_lba)
            .collect();
        assert_eq!(links, vec![12_000, 14_000]);

        let zone_types: Vec<&str> = table
            .enumerate_zones()
            .iter()
            .map(|z| z.zone_type.as_str())
            .collect();
        assert_eq!(zone_types, vec!["linux", "linux", "ntfs", "swap"]);
    }

    #[test]
    fn test_cyclic_chain_stops_at_link_limit() {
        let primary = table_sector(&[record(MbrPartitionType::EXTENDED, 10_000, 100_000)]);
        let looping = table_sector(&[record(MbrPartitionType::EXTENDED, 0, 100_000)]);

        let mut disk = disk_with(&[(0, primary), (10_000, looping)]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();

        assert_eq!(table.chain, ChainStatus::TooManyPartitions);
        let links = table.partitions.iter().filter(|p| p.is_chain_link()).count();
        assert_eq!(links as u32, MAX_EXTENDED_CHAIN_LINKS);
    }

    #[test]
    fn test_broken_chain_reported() {
        let primary = table_sector(&[
            record(0x83, 2048, 1000),
            record(MbrPartitionType::EXTENDED_LBA, 10_000, 100_000),
        ]);
        let mut disk = disk_with(&[(0, primary)]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();
        assert_eq!(
            table.chain,
            ChainStatus::InvalidExtended {
                table_lba: 10_000,
                read_error: false
            }
        );
        assert_eq!(table.partitions.len(), 2);
    }

    #[test]
    fn test_boot_info_classification() {
        let mut mbr = create_test_mbr();
        mbr[MbrTable::BOOT_INFO_OFFSET..MbrTable::BOOT_INFO_OFFSET + 8]
            .copy_from_slice(&84u64.to_le_bytes());
        mbr[100..112].copy_from_slice(b"isolinux.bin");
        let mut disk = disk_with(&[(0, mbr.clone())]);
        let info = MbrTable::decode(&mut disk, &mut FixedNames)
            .unwrap()
            .unwrap()
            .boot_info
            .unwrap();
        assert_eq!(info.kind, BootInfoKind::Isolinux);
        assert_eq!(info.first_lba, 84);
        assert_eq!(info.file_name.as_deref(), Some("/isolinux/isolinux.bin"));

        mbr[100..112].copy_from_slice(b"GRUB loader.");
        mbr[MbrTable::BOOT_INFO_OFFSET..MbrTable::BOOT_INFO_OFFSET + 8]
            .copy_from_slice(&88u64.to_le_bytes());
        let mut disk = disk_with(&[(0, mbr.clone())]);
        let info = MbrTable::decode(&mut disk, &mut NoNames)
            .unwrap()
            .unwrap()
            .boot_info
            .unwrap();
        assert_eq!(info.kind, BootInfoKind::Grub);
        assert_eq!(info.first_lba, 84);

        mbr[100..112].fill(0);
        let mut disk = disk_with(&[(0, mbr)]);
        let info = MbrTable::decode(&mut disk, &mut NoNames)
            .unwrap()
            .unwrap()
            .boot_info
            .unwrap();
        assert_eq!(info.kind, BootInfoKind::Bootinfo);
        assert_eq!(info.kind.name(), "bootinfo");
    }

    #[test]
    fn test_gpt_protective_detection() {
        let mut sector = MbrSector::new(0);
        sector.partitions[0] = PartitionRecord::protective(22_528, Geometry::new(64, 32), false);
        let mut disk = disk_with(&[(0, sector.to_bytes().to_vec())]);
        let table = MbrTable::decode(&mut disk, &mut NoNames).unwrap().unwrap();
        assert!(table.is_gpt_protective());
    }

    #[test]
    fn test_sector_layout() {
        let mut sector = MbrSector::new(0xDEAD_BEEF);
        sector.boot_code[0] = 0x33;
        sector.apple_header = true;
        sector.catalog_pointer = Some(21 * 4);
        sector.partitions[1] = PartitionRecord {
            start_chs: offset_to_chs(120, Geometry::new(64, 32), false),
            ..record(MbrPartitionType::EFI_SYSTEM, 120, 64)
        };

        let bytes = sector.to_bytes();
        assert_eq!(&bytes[..8], &[0x45, 0x52, 0x08, 0x00, 0x00, 0x00, 0x90, 0x90]);
        assert_eq!(read_u64_le(&bytes, 432), 84);
        assert_eq!(read_u32_le(&bytes, 440), 0xDEAD_BEEF);
        assert_eq!(&bytes[444..446], &[0, 0]);
        assert_eq!(bytes[446 + 16 + 4], 0xEF);
        assert_eq!(&bytes[510..], &[0x55, 0xAA]);

        assert_eq!(MbrSector::from_bytes(&bytes).partitions, sector.partitions);
        assert!(MbrSector::from_bytes(&bytes).apple_header);
    }
}
