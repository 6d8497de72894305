//! Per-disk inspection results and their text rendering

use crate::inspector::InspectOptions;
use hybridboot_pipeline::{Disk, DiskSource};
use hybridboot_zones::gpt::GptTable;
use hybridboot_zones::mbr::{ChainStatus, MbrPartition};
use hybridboot_zones::{ApmMap, GptProbe, MbrTable};
use serde::Serialize;
use std::io::{self, Write};

const SEPARATOR: &str = "- - - - - - - - - - - - - - - -";

/// Everything found on one disk
#[derive(Debug, Clone, Serialize)]
pub struct DiskReport {
    pub index: usize,
    pub name: String,
    pub source: &'static str,
    pub size: u64,
    /// 512-byte blocks
    pub blocks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbr: Option<MbrTable>,
    /// One entry per block size a GPT was found at
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gpt: Vec<GptProbe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apple: Option<ApmMap>,
    /// Failures that stopped one of the probes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl DiskReport {
    pub fn new(disk: &Disk) -> Self {
        Self {
            index: disk.index(),
            name: disk.name().to_string(),
            source: source_name(disk.source()),
            size: disk.size_in_bytes(),
            blocks: disk.size_in_bytes() / Disk::SECTOR_SIZE as u64,
            mbr: None,
            gpt: Vec::new(),
            apple: None,
            errors: Vec::new(),
        }
    }

    /// Nothing recognized and nothing failed
    pub fn is_empty(&self) -> bool {
        self.mbr.is_none() && self.gpt.is_empty() && self.apple.is_none() && self.errors.is_empty()
    }

    pub fn write_text(&self, options: &InspectOptions, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "===  disk {}: {}  ===", self.index, self.name)?;
        writeln!(out, "size: {} bytes ({} blocks)", self.size, self.blocks)?;

        if let Some(mbr) = &self.mbr {
            write_mbr(mbr, options, out)?;
        }
        for probe in &self.gpt {
            write_gpt(&probe.primary, "primary", out)?;
            match &probe.backup {
                Some(backup) => write_gpt(backup, "backup", out)?,
                None => writeln!(out, "{}\nno backup gpt", SEPARATOR)?,
            }
        }
        if let Some(apple) = &self.apple {
            write_apple(apple, out)?;
        }
        for error in &self.errors {
            writeln!(out, "{}\nerror: {}", SEPARATOR, error)?;
        }
        Ok(())
    }
}

fn source_name(source: DiskSource) -> &'static str {
    match source {
        DiskSource::File => "file",
        DiskSource::Synthetic => "synthetic",
        DiskSource::Imported => "imported",
    }
}

fn write_mbr(mbr: &MbrTable, options: &InspectOptions, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}\nmbr id: 0x{:08x}", SEPARATOR, mbr.disk_id)?;
    writeln!(out, "  sector size: {}", mbr.block_size)?;

    if let Some(info) = &mbr.boot_info {
        write!(out, "  {}: {}", info.kind.name(), info.first_lba)?;
        if let Some(name) = &info.file_name {
            write!(out, ", \"{}\"", name)?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "  mbr partition table (chs {}/{}/{}{}):",
        mbr.cylinders,
        mbr.geometry.heads,
        mbr.geometry.sectors,
        if mbr.geometry_consistent { "" } else { ", inconsistent geo" }
    )?;

    for partition in &mbr.partitions {
        write_mbr_partition(partition, options, out)?;
    }

    match mbr.chain {
        ChainStatus::Complete => {}
        ChainStatus::TooManyPartitions => writeln!(out, "too many partitions")?,
        ChainStatus::InvalidExtended { read_error, .. } => writeln!(
            out,
            "{}not a valid extended partition",
            if read_error { "disk read error - " } else { "" }
        )?,
    }
    Ok(())
}

fn write_mbr_partition(
    partition: &MbrPartition,
    options: &InspectOptions,
    out: &mut dyn Write,
) -> io::Result<()> {
    let entry = &partition.entry;
    if !entry.valid {
        if !entry.empty {
            writeln!(out, "  {:<3}  invalid data", partition.number)?;
        }
        return Ok(());
    }

    if partition.is_chain_link() {
        if !options.verbose {
            return Ok(());
        }
        write!(out, "    >")?;
    } else {
        write!(out, "  {:<3}", partition.number)?;
    }

    let base = if options.raw { 0 } else { entry.base as u64 };
    write!(
        out,
        "{} {} - {} (size {}), chs {}/{}/{} - {}/{}/{}",
        if entry.boot { '*' } else { ' ' },
        entry.start_lba as u64 + base,
        entry.end_lba as u64 + base,
        partition.size,
        entry.start.cylinder,
        entry.start.head,
        entry.start.sector,
        entry.end.cylinder,
        entry.end.head,
        entry.end.sector,
    )?;
    if options.verbose {
        write!(out, ", [ref {}.{}]", entry.table_lba, entry.table_index)?;
    }
    if options.raw && entry.base != 0 {
        write!(out, ", ext base +{}", entry.base)?;
    }
    writeln!(out)?;

    write!(out, "       type 0x{:02x}", entry.partition_type)?;
    if let Some(name) = partition.type_name {
        write!(out, " ({})", name)?;
    }
    writeln!(out)
}

fn write_gpt(gpt: &GptTable, which: &str, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}\ngpt ({}) guid: {}", SEPARATOR, which, gpt.guid)?;
    writeln!(out, "  sector size: {}", gpt.block_size)?;
    writeln!(out, "  revision: {}", gpt.revision)?;
    writeln!(
        out,
        "  header: size {}, crc 0x{:08x} - {}",
        gpt.header_size,
        gpt.header_crc.stored,
        ok_or_wrong(gpt.header_crc.ok)
    )?;
    writeln!(
        out,
        "  position: current {}, backup {}",
        gpt.my_lba, gpt.alternate_lba
    )?;
    writeln!(
        out,
        "  usable area: {} - {} (size {})",
        gpt.first_usable_lba, gpt.last_usable_lba, gpt.usable_size
    )?;

    let Some(array) = &gpt.partition_table else {
        return writeln!(out, "error reading gpt");
    };
    writeln!(
        out,
        "  partition table: {} - {} (size {}, crc 0x{:08x} - {}), entries {}, entry_size {}",
        array.first_lba,
        array.last_lba,
        array.size,
        array.crc.stored,
        ok_or_wrong(array.crc.ok),
        array.entries,
        array.entry_size
    )?;

    for partition in &gpt.partitions {
        let attributes = partition.attributes;
        writeln!(
            out,
            "  {:<3}{} {} - {} (size {})",
            partition.number,
            if attributes.boot { '*' } else { ' ' },
            partition.first_lba,
            partition.last_lba,
            partition.size
        )?;

        write!(out, "       type {}", partition.type_guid)?;
        if let Some(name) = partition.type_name {
            write!(out, " ({})", name)?;
        }
        write!(out, ", attributes 0x{:x}", attributes.value)?;
        let flags: Vec<&str> = [
            (attributes.system, "system"),
            (attributes.hidden, "hidden"),
            (attributes.boot, "boot"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
        if !flags.is_empty() {
            write!(out, " ({})", flags.join(", "))?;
        }
        writeln!(out)?;

        writeln!(out, "       guid {}", partition.guid)?;
        writeln!(
            out,
            "       name[{}] \"{}\"",
            partition.name.chars().count(),
            partition.name
        )?;
    }
    Ok(())
}

fn write_apple(apple: &ApmMap, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}\napple partition table: {} entries", SEPARATOR, apple.entries)?;
    writeln!(out, "  sector size: {}", apple.block_size)?;
    for partition in &apple.partitions {
        writeln!(
            out,
            "{:>3}  {} - {} (size {}), rel. {} - {} (size {})",
            partition.number,
            partition.first_lba,
            partition.last_lba,
            partition.size,
            partition.data_start,
            partition.data_start as u64 + partition.data_size as u64,
            partition.data_size
        )?;
        writeln!(
            out,
            "     type[{}] \"{}\", status 0x{:x}",
            partition.partition_type.len(),
            partition.partition_type,
            partition.status
        )?;
        writeln!(out, "     name[{}] \"{}\"", partition.name.len(), partition.name)?;
    }
    Ok(())
}

fn ok_or_wrong(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "wrong"
    }
}
