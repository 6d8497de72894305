//! GPT (GUID Partition Table) partition table implementation

pub mod types;

use hybridboot_core::bytes::is_zero;
use hybridboot_core::{
    crc32, validate_allocation_size, Guid, Result, Zone, ZoneTable, MAX_PARTITION_ARRAY_SIZE,
    PROBE_BLOCK_SIZES,
};
use hybridboot_pipeline::Disk;
use serde::{Serialize, Serializer};
use types::{GptHeader, GptPartitionEntry, PartitionTypeGuid};

fn hex32<S: Serializer>(value: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{:08x}", value))
}

/// A stored checksum next to the one computed from the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrcCheck {
    #[serde(serialize_with = "hex32")]
    pub stored: u32,
    #[serde(serialize_with = "hex32")]
    pub calculated: u32,
    pub ok: bool,
}

impl CrcCheck {
    fn new(stored: u32, calculated: u32) -> Self {
        Self {
            stored,
            calculated,
            ok: stored == calculated,
        }
    }
}

/// Where the partition array sits and whether it checks out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionArray {
    pub first_lba: u64,
    pub last_lba: u64,
    /// In blocks
    pub size: u64,
    pub entries: u32,
    pub entry_size: u32,
    pub crc: CrcCheck,
}

/// Decoded GPT attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GptAttributes {
    pub value: u64,
    pub system: bool,
    pub hidden: bool,
    pub boot: bool,
}

impl From<u64> for GptAttributes {
    fn from(value: u64) -> Self {
        Self {
            value,
            system: value & GptPartitionEntry::ATTR_SYSTEM != 0,
            hidden: value & GptPartitionEntry::ATTR_HIDDEN != 0,
            boot: value & GptPartitionEntry::ATTR_LEGACY_BOOT != 0,
        }
    }
}

/// One used slot of the partition array
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GptPartition {
    /// Slot in the array, from 0
    pub index: usize,
    pub number: usize,
    pub first_lba: u64,
    pub last_lba: u64,
    pub size: u64,
    pub type_guid: Guid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<&'static str>,
    pub attributes: GptAttributes,
    pub guid: Guid,
    pub name: String,
    pub name_hex: String,
}

impl GptPartition {
    fn new(index: usize, entry: &GptPartitionEntry) -> Self {
        Self {
            index,
            number: index + 1,
            first_lba: entry.first_lba,
            last_lba: entry.last_lba,
            size: entry.size_lba(),
            type_guid: entry.partition_type_guid.0,
            type_name: entry.partition_type_guid.name(),
            attributes: entry.attributes.into(),
            guid: entry.unique_partition_guid,
            name: entry.name(),
            name_hex: entry.name_hex(),
        }
    }
}

/// GPT partition table
///
/// The GUID Partition Table is the modern partitioning scheme used by UEFI-based systems.
/// It supports up to 128 partitions by default and uses GUIDs for partition identification.
///
/// # Structure
///
/// ```text
/// LBA 0:    Protective MBR (for backward compatibility)
/// LBA 1:    Primary GPT header
/// LBA 2-33: Partition entries array (typically 128 entries)
/// LBA 34+:  Usable disk space
/// ...
/// Last 33:  Backup partition entries array
/// Last 1:   Backup GPT header
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct GptTable {
    pub block_size: u32,
    pub revision: String,
    pub guid: Guid,
    pub header_size: u32,
    pub header_crc: CrcCheck,
    pub reserved: u32,
    pub my_lba: u64,
    pub alternate_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub usable_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_table: Option<PartitionArray>,
    /// Why the partition array could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_table_error: Option<String>,
    pub partitions: Vec<GptPartition>,
    #[serde(skip)]
    header: GptHeader,
    #[serde(skip)]
    zones: Vec<Zone>,
}

impl GptTable {
    /// Decode the header at block `lba` at the disk's current block size
    ///
    /// Returns `None` if the block cannot be read or lacks the signature.
    /// CRC mismatches and an unreadable partition array are recorded, not
    /// fatal.
    pub fn decode(disk: &mut Disk, lba: u64) -> Option<Self> {
        let block_size = disk.block_size();
        let raw = match disk.read(lba, 1) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("{}: no gpt at {}: {}", disk.name(), lba, e);
                return None;
            }
        };
        let header = GptHeader::from_bytes(&raw)?;

        let header_crc = CrcCheck::new(header.header_crc32, header.calculate_header_crc32(&raw));
        if !header_crc.ok {
            tracing::warn!(
                "{}: gpt header at {} has wrong crc 0x{:08x}",
                disk.name(),
                lba,
                header.header_crc32
            );
        }

        let (partition_table, partition_table_error, partitions) = match read_array(disk, &header) {
            Ok((array, partitions)) => (Some(array), None, partitions),
            Err(e) => {
                tracing::warn!("{}: error reading gpt: {}", disk.name(), e);
                (None, Some(e.to_string()), Vec::new())
            }
        };

        let zones = partitions
            .iter()
            .map(|p| {
                let zone_type = p
                    .type_name
                    .map(str::to_string)
                    .unwrap_or_else(|| p.type_guid.to_string());
                Zone::new(
                    p.number,
                    p.first_lba * block_size as u64,
                    p.size * block_size as u64,
                    zone_type,
                )
            })
            .collect();

        tracing::info!(
            "{}: gpt at {} (block size {}), {} partitions",
            disk.name(),
            lba,
            block_size,
            partitions.len()
        );

        Some(Self {
            block_size,
            revision: header.revision_string(),
            guid: header.disk_guid,
            header_size: header.header_size,
            header_crc,
            reserved: header.reserved,
            my_lba: header.current_lba,
            alternate_lba: header.backup_lba,
            first_usable_lba: header.first_usable_lba,
            last_usable_lba: header.last_usable_lba,
            usable_size: header
                .last_usable_lba
                .wrapping_sub(header.first_usable_lba)
                .wrapping_add(1),
            partition_table,
            partition_table_error,
            partitions,
            header,
            zones,
        })
    }

    /// Get the GPT header
    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    /// Header and array CRCs both match
    pub fn is_consistent(&self) -> bool {
        self.header_crc.ok && self.partition_table.as_ref().is_some_and(|a| a.crc.ok)
    }
}

impl ZoneTable for GptTable {
    fn identify(&self) -> &str {
        "GUID Partition Table"
    }

    fn enumerate_zones(&self) -> &[Zone] {
        &self.zones
    }
}

/// Read and decode the partition array `header` points at
fn read_array(disk: &mut Disk, header: &GptHeader) -> Result<(PartitionArray, Vec<GptPartition>)> {
    let entry_size = header.partition_entry_size as usize;
    if entry_size < GptPartitionEntry::ENTRY_SIZE {
        return Err(hybridboot_core::Error::invalid_zone_table(format!(
            "partition entry size {} is below {}",
            entry_size,
            GptPartitionEntry::ENTRY_SIZE
        )));
    }

    let bytes = validate_allocation_size(
        header.array_bytes(),
        MAX_PARTITION_ARRAY_SIZE,
        "gpt partition array",
    )?;
    if bytes == 0 {
        return Err(hybridboot_core::Error::invalid_zone_table(
            "empty partition array",
        ));
    }

    let block_size = disk.block_size() as usize;
    let blocks = bytes.div_ceil(block_size);
    let data = disk.read(header.partition_entries_lba, blocks as u32)?;
    let data = &data[..bytes];

    let array = PartitionArray {
        first_lba: header.partition_entries_lba,
        last_lba: header.partition_entries_lba + blocks as u64 - 1,
        size: blocks as u64,
        entries: header.num_partition_entries,
        entry_size: header.partition_entry_size,
        crc: CrcCheck::new(header.partition_entries_crc32, crc32(data)),
    };

    let partitions = data
        .chunks_exact(entry_size)
        .enumerate()
        .filter(|(_, raw)| !is_zero(raw))
        .map(|(i, raw)| GptPartition::new(i, &GptPartitionEntry::from_bytes(raw)))
        .collect();

    Ok((array, partitions))
}

/// A primary GPT and the backup it points to, found at one block size
#[derive(Debug, Clone, Serialize)]
pub struct GptProbe {
    pub block_size: u32,
    pub primary: GptTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<GptTable>,
}

impl GptProbe {
    /// Look for a GPT at LBA 1 under every candidate block size
    ///
    /// Every block size that yields a primary header is reported. The disk's
    /// block size is restored afterwards.
    pub fn probe(disk: &mut Disk) -> Result<Vec<GptProbe>> {
        let original = disk.block_size();
        let mut found = Vec::new();

        for block_size in PROBE_BLOCK_SIZES {
            if disk.set_block_size(block_size).is_err() {
                continue;
            }

            let Some(primary) = GptTable::decode(disk, 1) else {
                continue;
            };

            let backup = match primary.alternate_lba {
                0 => None,
                lba => GptTable::decode(disk, lba),
            };
            if backup.is_none() {
                tracing::info!("{}: no backup gpt", disk.name());
            }

            found.push(GptProbe {
                block_size,
                primary,
                backup,
            });
        }

        disk.set_block_size(original)?;
        Ok(found)
    }
}

/// The GPT pair a hybrid image carries
///
/// Entries live in the first four slots of a 128-entry array. Both copies
/// share the disk GUID and the entries.
#[derive(Debug, Clone)]
pub struct GptLayout {
    /// Image size in 512-byte sectors
    pub total_sectors: u64,
    /// Sectors kept free after the primary header for the Apple partition map
    pub apm_hole: u64,
    pub disk_guid: Guid,
    pub slots: [Option<GptPartitionEntry>; 4],
}

impl GptLayout {
    /// Sector size the builder writes in
    pub const SECTOR_SIZE: u64 = 512;

    /// Header sector plus the 128-entry array
    pub const TABLE_SECTORS: u64 = 1 + Self::ARRAY_SECTORS;

    /// 128 entries of 128 bytes
    pub const ARRAY_SECTORS: u64 = 32;

    /// Bytes written at the end of the image
    pub const BACKUP_SIZE: usize = 512 + 128 * 128;

    /// Hole left for an Apple partition map of three 2048-byte slots
    pub const APM_HOLE_SECTORS: u64 = 3 * 4 + 2;

    pub fn new(total_sectors: u64, mac: bool) -> Self {
        Self {
            total_sectors,
            apm_hole: if mac { Self::APM_HOLE_SECTORS } else { 0 },
            disk_guid: Guid::new_random(),
            slots: Default::default(),
        }
    }

    /// Put `entry` in partition slot `number` (1-4)
    pub fn set_slot(&mut self, number: usize, entry: GptPartitionEntry) {
        if let Some(slot) = number.checked_sub(1).and_then(|i| self.slots.get_mut(i)) {
            *slot = Some(entry);
        }
    }

    /// The serialized 128-entry array
    pub fn array(&self) -> Vec<u8> {
        let entry_size = GptPartitionEntry::ENTRY_SIZE;
        let mut out = vec![0u8; GptHeader::ENTRY_COUNT as usize * entry_size];
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot {
                out[i * entry_size..(i + 1) * entry_size].copy_from_slice(&entry.to_bytes());
            }
        }
        out
    }

    /// Header for the primary (LBA 1) or backup (last sector) copy, CRCs set
    pub fn header(&self, primary: bool, array: &[u8]) -> GptHeader {
        let last = self.total_sectors - 1;
        let (current_lba, backup_lba, partition_entries_lba) = if primary {
            (1, last, 2 + self.apm_hole)
        } else {
            (last, 1, last - Self::ARRAY_SECTORS)
        };

        let mut header = GptHeader {
            revision: GptHeader::REVISION_1_0,
            header_size: GptHeader::HEADER_SIZE as u32,
            header_crc32: 0,
            reserved: 0,
            current_lba,
            backup_lba,
            first_usable_lba: 2 + Self::ARRAY_SECTORS + self.apm_hole,
            last_usable_lba: self.total_sectors - Self::ARRAY_SECTORS - 2,
            disk_guid: self.disk_guid,
            partition_entries_lba,
            num_partition_entries: GptHeader::ENTRY_COUNT,
            partition_entry_size: GptPartitionEntry::ENTRY_SIZE as u32,
            partition_entries_crc32: 0,
        };
        header.seal(array);
        header
    }

    /// Bytes for offset 512: header sector, APM hole, array
    pub fn encode_primary(&self) -> Vec<u8> {
        let array = self.array();
        let header = self.header(true, &array);

        let mut out = vec![0u8; Self::SECTOR_SIZE as usize];
        out[..GptHeader::HEADER_SIZE].copy_from_slice(&header.to_bytes());
        out.resize(((1 + self.apm_hole) * Self::SECTOR_SIZE) as usize, 0);
        out.extend_from_slice(&array);
        out
    }

    /// Bytes for [`GptLayout::backup_offset`]: array, then header sector
    pub fn encode_backup(&self) -> Vec<u8> {
        let mut out = self.array();
        let header = self.header(false, &out);

        let start = out.len();
        out.resize(Self::BACKUP_SIZE, 0);
        out[start..start + GptHeader::HEADER_SIZE].copy_from_slice(&header.to_bytes());
        out
    }

    pub fn backup_offset(&self) -> u64 {
        (self.total_sectors - Self::TABLE_SECTORS) * Self::SECTOR_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(disk: &mut Disk, offset: u64, bytes: &[u8]) {
        for (i, chunk) in bytes.chunks(512).enumerate() {
            disk.store_chunk(offset / 512 + i as u64, chunk.to_vec());
        }
    }

    fn test_layout(mac: bool) -> GptLayout {
        let mut layout = GptLayout::new(22_528, mac);
        layout.set_slot(
            1,
            GptPartitionEntry::new(PartitionTypeGuid::BASIC_DATA, 0, 20_479, "ISOHybrid ISO"),
        );
        layout.set_slot(
            2,
            GptPartitionEntry::new(PartitionTypeGuid::EFI_SYSTEM, 120, 183, "ISOHybrid"),
        );
        layout
    }

    fn disk_with(layout: &GptLayout) -> Disk {
        let mut disk = Disk::synthetic("gpt", layout.total_sectors * 512);
        store(&mut disk, 512, &layout.encode_primary());
        store(&mut disk, layout.backup_offset(), &layout.encode_backup());
        disk
    }

    #[test]
    fn test_layout_offsets() {
        let layout = test_layout(false);
        assert_eq!(layout.encode_primary().len(), 512 + 16_384);
        assert_eq!(layout.encode_backup().len(), GptLayout::BACKUP_SIZE);
        assert_eq!(layout.backup_offset(), (22_528 - 33) * 512);

        let array = layout.array();
        let backup = layout.header(false, &array);
        assert_eq!(backup.current_lba, 22_527);
        assert_eq!(backup.backup_lba, 1);
        assert_eq!(backup.partition_entries_lba, 22_495);
        assert_eq!(backup.first_usable_lba, 34);
        assert_eq!(backup.last_usable_lba, 22_494);
    }

    #[test]
    fn test_apm_hole_moves_primary_array() {
        let layout = test_layout(true);
        let array = layout.array();
        let header = layout.header(true, &array);
        assert_eq!(header.partition_entries_lba, 16);
        assert_eq!(header.first_usable_lba, 48);
        assert_eq!(layout.encode_primary().len(), 15 * 512 + 16_384);
    }

    #[test]
    fn test_gpt_round_trip() {
        let layout = test_layout(false);
        let mut disk = disk_with(&layout);

        let table = GptTable::decode(&mut disk, 1).unwrap();
        assert_eq!(table.identify(), "GUID Partition Table");
        assert!(table.is_consistent());
        assert_eq!(table.revision, "1.0");
        assert_eq!(table.guid, layout.disk_guid);
        assert_eq!(table.my_lba, 1);
        assert_eq!(table.alternate_lba, 22_527);

        let array = table.partition_table.as_ref().unwrap();
        assert_eq!(array.first_lba, 2);
        assert_eq!(array.last_lba, 33);
        assert_eq!(array.entries, 128);

        assert_eq!(table.partitions.len(), 2);
        let data = &table.partitions[0];
        assert_eq!(data.number, 1);
        assert_eq!(data.first_lba, 0);
        assert_eq!(data.last_lba, 20_479);
        assert_eq!(data.type_guid, PartitionTypeGuid::BASIC_DATA.0);
        assert_eq!(data.name, "ISOHybrid ISO");

        let efi = &table.partitions[1];
        assert_eq!(efi.first_lba, 120);
        assert_eq!(efi.size, 64);
        assert_eq!(efi.type_name, Some("efi system"));
        assert_ne!(efi.guid, data.guid);

        let zones = table.enumerate_zones();
        assert_eq!(zones[1].offset, 120 * 512);
        assert_eq!(zones[1].zone_type, "efi system");
    }

    #[test]
    fn test_probe_finds_backup() {
        let layout = test_layout(false);
        let mut disk = disk_with(&layout);

        let probes = GptProbe::probe(&mut disk).unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].block_size, 512);

        let backup = probes[0].backup.as_ref().unwrap();
        assert!(backup.is_consistent());
        assert_eq!(backup.my_lba, 22_527);
        assert_eq!(backup.partitions, probes[0].primary.partitions);
        assert_eq!(disk.block_size(), 512);
    }

    #[test]
    fn test_corrupted_crcs_are_flagged() {
        let layout = test_layout(false);
        let mut primary = layout.encode_primary();
        primary[40] ^= 0xFF;
        primary[512 + 56] = b'X';

        let mut disk = Disk::synthetic("gpt", layout.total_sectors * 512);
        store(&mut disk, 512, &primary);

        let table = GptTable::decode(&mut disk, 1).unwrap();
        assert!(!table.header_crc.ok);
        assert!(!table.partition_table.as_ref().unwrap().crc.ok);
        assert!(!table.is_consistent());

        let probes = GptProbe::probe(&mut disk).unwrap();
        assert!(probes[0].backup.is_none());
    }

    #[test]
    fn test_oversized_array_is_reported() {
        let layout = test_layout(false);
        let array = layout.array();
        let mut header = layout.header(true, &array);
        header.num_partition_entries = 1 << 20;
        header.seal(&array);

        let mut disk = Disk::synthetic("gpt", layout.total_sectors * 512);
        store(&mut disk, 512, &header.to_bytes());

        let table = GptTable::decode(&mut disk, 1).unwrap();
        assert!(table.header_crc.ok);
        assert!(table.partition_table.is_none());
        assert!(table.partition_table_error.is_some());
        assert!(table.partitions.is_empty());
    }

    #[test]
    fn test_no_signature() {
        let mut disk = Disk::synthetic("blank", 1024 * 1024);
        assert!(GptTable::decode(&mut disk, 1).is_none());
        assert!(GptProbe::probe(&mut disk).unwrap().is_empty());
    }

    #[test]
    fn test_crc_serializes_as_hex() {
        let check = CrcCheck::new(0xAB, 0xAB);
        let json = serde_json::to_value(check).unwrap();
        assert_eq!(json["stored"], "0x000000ab");
        assert_eq!(json["ok"], true);
    }
}
