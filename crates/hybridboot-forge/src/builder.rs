//! Hybrid image builder
//!
//! Writes the MBR, the GPT pair and the Apple partition map into the system
//! area of an ISO so it also boots as a disk. The ISO itself is left alone
//! apart from the optional GRUB boot-info patch and the padding at the end.

use crate::bootcode::resolve_boot_code;
use crate::eltorito::{bpb_total_sectors, IsoBootCatalog, PrimaryVolume, ISO_SECTOR_SIZE};
use crate::image::{read_at, write_at, ImageFile};
use crate::options::{HybridOptions, PartitionNumbers, TableMode};
use hybridboot_core::bytes::{read_u32_le, read_u64_le};
use hybridboot_core::{BootCatalogProvider, BootImage, BootImages, Error, Guid, Result};
use hybridboot_zones::gpt::types::{GptPartitionEntry, PartitionTypeGuid};
use hybridboot_zones::gpt::GptLayout;
use hybridboot_zones::mbr::types::{MbrPartitionType, PartitionRecord};
use hybridboot_zones::mbr::MbrSector;
use hybridboot_zones::{ApmMap, MbrTable};
use serde::Serialize;

/// Bytes zeroed at the start of the image before the tables are written
pub const SYSTEM_AREA_SIZE: usize = 16 * ISO_SECTOR_SIZE as usize;

/// Padding added when neither free space nor cylinder padding holds the backup GPT
pub const GPT_PADDING: u64 = 1024 * 1024;

/// isolinux.bin hybrid signature at byte 0x40 of the boot image
pub const ISOLINUX_SIGNATURE: [u8; 4] = [0xFB, 0xC0, 0x78, 0x70];

/// GRUB boot-info location pointer inside the boot image
const GRUB_BOOT_INFO_OFFSET: u64 = 0x9f4;

/// GRUB boot-info checksum inside the boot image
const GRUB_CHECKSUM_OFFSET: u64 = 20;

const SECTOR: u64 = 512;

/// What a build did
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Bytes covered by the ISO filesystem
    pub iso_size: u64,
    /// Image length before padding
    pub image_size: u64,
    pub padding: u64,
    /// Image length the tables describe
    pub iso_filesize: u64,
    pub cylinders: u64,
    pub disk_id: u32,
    pub boot_images: BootImages,
    pub tables: TableMode,
    pub partitions: PartitionNumbers,
    /// Byte offset of the backup GPT, when written
    pub backup_gpt_offset: Option<u64>,
}

/// Turns ISO images into hybrid images for one set of options
#[derive(Debug, Clone)]
pub struct HybridBuilder {
    options: HybridOptions,
}

impl HybridBuilder {
    pub fn new(options: HybridOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HybridOptions {
        &self.options
    }

    /// Build in place, taking boot images from the ISO's own El Torito catalog
    pub fn build<F: ImageFile + ?Sized>(&self, image: &mut F) -> Result<BuildReport> {
        self.options.validate()?;
        let mut catalog = IsoBootCatalog::read(image, self.options.legacy)?;
        self.build_with_catalog(image, &mut catalog)
    }

    /// Build in place with boot images from `catalog`
    pub fn build_with_catalog<F: ImageFile + ?Sized>(
        &self,
        image: &mut F,
        catalog: &mut dyn BootCatalogProvider,
    ) -> Result<BuildReport> {
        let options = &self.options;
        options.validate()?;

        let volume = PrimaryVolume::read(image)?;
        let iso_size = volume.iso_size();
        if iso_size == 0 {
            return Err(Error::invalid_image("no primary volume descriptor"));
        }
        tracing::debug!(
            "volume: {} blocks of {} bytes",
            volume.volume_blocks,
            volume.block_size
        );

        let mut images = catalog.boot_images(options.uefi, options.mac)?;
        if !images.has_catalog() {
            if options.uefi || options.mac {
                tracing::warn!("no boot catalogue, EFI and Mac partitions disabled");
            }
            images.efi = None;
            images.mac = None;
        } else {
            self.check_boot_images(image, &mut images)?;
        }

        // settle partition slots on what the catalog actually has
        let effective = HybridOptions {
            uefi: images.efi.is_some(),
            mac: images.mac.is_some(),
            ..options.clone()
        };
        let mut partitions = effective.partition_numbers();
        partitions.reorder_for_offset(options.offset, images.efi.map_or(0, |efi| efi.lba));

        let tables = options.table_mode();
        let geometry = options.geometry();

        let image_size = image.image_len()?;
        let free_space = image_size.saturating_sub(iso_size);
        let cylinder_size = geometry.cylinder_sectors() * SECTOR;
        let frac = image_size % cylinder_size;
        let mut padding = if frac > 0 { cylinder_size - frac } else { 0 };
        let cylinders = (image_size + padding) / cylinder_size;

        let backup_size = GptLayout::BACKUP_SIZE as u64;
        if tables.gpt && free_space < backup_size && padding < backup_size {
            padding += GPT_PADDING;
        }
        let iso_filesize = image_size + padding;
        tracing::info!("imgsize: {}, padding: {}", iso_filesize, padding);

        let disk_id = self.disk_id(image)?;
        tracing::info!("id: {}", disk_id);

        let mbr = self.mbr_sector(
            &images,
            partitions,
            tables,
            disk_id,
            cylinders,
            iso_filesize,
        )?;

        write_at(image, 0, &vec![0u8; SYSTEM_AREA_SIZE])?;
        write_at(image, 0, &mbr)?;

        let gpt = tables.gpt.then(|| {
            let mut layout = GptLayout::new(iso_filesize / SECTOR, images.mac.is_some());
            layout.set_slot(
                partitions.data,
                GptPartitionEntry::new(
                    PartitionTypeGuid::BASIC_DATA,
                    options.offset as u64,
                    (iso_size / SECTOR).wrapping_sub(1),
                    "ISOHybrid ISO",
                ),
            );
            if let (Some(number), Some(efi)) = (partitions.efi, images.efi) {
                layout.set_slot(number, image_entry(PartitionTypeGuid::EFI_SYSTEM, efi));
            }
            if let (Some(number), Some(mac)) = (partitions.mac, images.mac) {
                layout.set_slot(number, image_entry(PartitionTypeGuid::HFS_PLUS, mac));
            }
            layout
        });

        if let Some(layout) = &gpt {
            write_at(image, SECTOR, &layout.encode_primary())?;
        }

        if images.mac.is_some() {
            let efi = images.efi.unwrap_or(BootImage { lba: 0, sectors: 0 });
            write_at(image, ApmMap::OFFSET, &ApmMap::encode_hybrid(efi, images.mac))?;
        }

        if padding > 0 && options.size.is_none() {
            image.set_image_len(iso_filesize)?;
        }

        let backup_gpt_offset = match &gpt {
            Some(layout) => {
                let offset = layout.backup_offset();
                write_at(image, offset, &layout.encode_backup())?;
                Some(offset)
            }
            None => None,
        };
        image.flush()?;

        Ok(BuildReport {
            iso_size,
            image_size,
            padding,
            iso_filesize,
            cylinders,
            disk_id,
            boot_images: images,
            tables,
            partitions,
            backup_gpt_offset,
        })
    }

    /// EFI size fixup and boot loader checks, run while the ISO is untouched
    fn check_boot_images<F: ImageFile + ?Sized>(
        &self,
        image: &mut F,
        images: &mut BootImages,
    ) -> Result<()> {
        if let Some(efi) = images.efi.as_mut() {
            if efi.sectors < 2 {
                let mut bpb = [0u8; 512];
                read_at(image, efi.lba as u64 * ISO_SECTOR_SIZE, &mut bpb)?;
                if let Some(count) = bpb_total_sectors(&bpb) {
                    tracing::debug!("efi image size from BPB: {} sectors", count);
                    efi.sectors = count;
                }
            }
        }

        if !self.options.legacy {
            return Ok(());
        }

        let boot = images.boot_lba as u64 * ISO_SECTOR_SIZE;
        let mut signature = [0u8; 4];
        read_at(image, boot + 0x40, &mut signature)?;

        if self.options.grub {
            patch_grub_boot_info(image, images.boot_lba)?;
        } else if signature != ISOLINUX_SIGNATURE {
            tracing::warn!(
                "boot loader does not have an isolinux.bin hybrid signature. \
                 Note that isolinux-debug.bin does not support hybrid booting"
            );
        }
        Ok(())
    }

    /// `--id`, else the id already at byte 440, else random
    fn disk_id<F: ImageFile + ?Sized>(&self, image: &mut F) -> Result<u32> {
        if let Some(id) = self.options.id.filter(|&id| id != 0) {
            return Ok(id);
        }

        let mut raw = [0u8; 4];
        read_at(image, MbrTable::DISK_SIGNATURE_OFFSET as u64, &mut raw)?;
        match read_u32_le(&raw, 0) {
            0 => {
                tracing::debug!("random disk id");
                let random = Guid::new_random();
                Ok(read_u32_le(random.as_bytes(), 0))
            }
            id => Ok(id),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn mbr_sector(
        &self,
        images: &BootImages,
        partitions: PartitionNumbers,
        tables: TableMode,
        disk_id: u32,
        cylinders: u64,
        iso_filesize: u64,
    ) -> Result<[u8; MbrTable::MBR_SIZE]> {
        let options = &self.options;
        if options.no_mbr {
            return Ok([0u8; MbrTable::MBR_SIZE]);
        }

        let geometry = options.geometry();
        let mut sector = MbrSector::new(disk_id);

        if images.has_catalog() && !options.no_code {
            sector.boot_code = resolve_boot_code(options)?;
        }
        sector.apple_header = images.mac.is_some();
        if !options.no_code {
            sector.catalog_pointer = Some((images.boot_lba as u64 + options.grub as u64) * 4);
        }

        if !tables.mbr {
            if tables.gpt {
                sector.partitions[0] = PartitionRecord::protective(
                    (iso_filesize / SECTOR) as u32,
                    geometry,
                    options.no_chs,
                );
            }
            return Ok(sector.to_bytes());
        }

        let end = options
            .size
            .unwrap_or((cylinders * geometry.cylinder_sectors()) as u32);
        set_record(
            &mut sector,
            partitions.data,
            PartitionRecord::span(
                options.data_partition_type(),
                options.offset,
                end.wrapping_sub(options.offset),
                end.wrapping_sub(1),
                geometry,
                options.no_chs,
            )
            .bootable(),
        );

        if let (Some(number), Some(efi)) = (partitions.efi, images.efi) {
            let start = efi.lba.wrapping_mul(4);
            set_record(
                &mut sector,
                number,
                PartitionRecord::span(
                    MbrPartitionType::EFI_SYSTEM,
                    start,
                    efi.sectors,
                    start.wrapping_add(efi.sectors).wrapping_sub(1),
                    geometry,
                    options.no_chs,
                ),
            );
        }

        if let (Some(number), Some(mac)) = (partitions.mac, images.mac) {
            set_record(
                &mut sector,
                number,
                PartitionRecord {
                    status: 0,
                    start_chs: [0xfe, 0xff, 0xff],
                    partition_type: MbrPartitionType::EMPTY,
                    end_chs: [0xfe, 0xff, 0xff],
                    start_lba: mac.lba.wrapping_mul(4),
                    sectors: mac.sectors,
                },
            );
        }

        Ok(sector.to_bytes())
    }
}

fn set_record(sector: &mut MbrSector, number: usize, record: PartitionRecord) {
    if let Some(slot) = number.checked_sub(1).and_then(|i| sector.partitions.get_mut(i)) {
        *slot = record;
    }
}

fn image_entry(partition_type: PartitionTypeGuid, image: BootImage) -> GptPartitionEntry {
    let first = image.lba as u64 * 4;
    GptPartitionEntry::new(
        partition_type,
        first,
        (first + image.sectors as u64).wrapping_sub(1),
        "ISOHybrid",
    )
}

/// Point GRUB's boot info at the boot image and keep its checksum balanced
fn patch_grub_boot_info<F: ImageFile + ?Sized>(image: &mut F, boot_lba: u32) -> Result<()> {
    let boot = boot_lba as u64 * ISO_SECTOR_SIZE;

    let mut raw = [0u8; 8];
    read_at(image, boot + GRUB_BOOT_INFO_OFFSET, &mut raw)?;
    let old = read_u64_le(&raw, 0);
    let new = boot_lba as u64 * 4 + 5;
    write_at(image, boot + GRUB_BOOT_INFO_OFFSET, &new.to_le_bytes())?;

    let mut raw = [0u8; 4];
    read_at(image, boot + GRUB_CHECKSUM_OFFSET, &mut raw)?;
    let checksum = read_u32_le(&raw, 0)
        .wrapping_add(new.wrapping_sub(old) as u32)
        .wrapping_add((new >> 32).wrapping_sub(old >> 32) as u32);
    write_at(image, boot + GRUB_CHECKSUM_OFFSET, &checksum.to_le_bytes())?;

    tracing::debug!("grub boot info: {} -> {}", old, new);
    Ok(())
}
