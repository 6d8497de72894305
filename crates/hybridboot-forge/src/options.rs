//! Builder configuration

use hybridboot_core::{Error, Result};
use hybridboot_zones::Geometry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the boot code decides it was loaded as disk 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hd0Mode {
    /// Use the BIOS drive number
    #[default]
    Off,
    /// Always assume disk 0
    Force,
    /// Assume disk 0 while Ctrl is held
    Ctrl,
}

impl Hd0Mode {
    pub fn index(&self) -> usize {
        match self {
            Self::Off => 0,
            Self::Force => 1,
            Self::Ctrl => 2,
        }
    }
}

/// Options for turning an ISO into a hybrid image
///
/// Deserializes from partial JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridOptions {
    /// Heads of the geometry used for CHS values (1-256)
    pub heads: u32,
    /// Sectors per track of the geometry (1-63)
    pub sectors: u32,
    /// MBR slot for the data partition (1-4)
    pub entry: Option<u8>,
    /// First sector of the data partition
    pub offset: u32,
    /// MBR type of the data partition
    pub partition_type: u16,
    /// Disk id; read from the image or random when unset
    pub id: Option<u32>,
    pub hd0: Hd0Mode,
    /// Allow booting from within a partition
    pub partok: bool,
    /// Add an EFI System partition
    pub uefi: bool,
    /// Add Mac HFS+ support with an Apple partition map
    pub mac: bool,
    pub gpt: bool,
    pub mbr: bool,
    /// Skip the protective MBR in GPT mode
    pub no_mbr: bool,
    /// Skip the MBR boot code and catalog pointer
    pub no_code: bool,
    /// Write `ff ff ff` instead of CHS values
    pub no_chs: bool,
    /// Disk size in sectors the data partition should cover
    pub size: Option<u32>,
    /// Expect an El Torito BIOS boot entry
    pub legacy: bool,
    /// Boot code from a file (first 432 bytes)
    pub mbr_file: Option<PathBuf>,
    /// Boot code table of 6 entries of 432 bytes, indexed by `hd0 + 3 * partok`
    pub boot_code_table: Option<PathBuf>,
    /// The boot image is GRUB rather than isolinux
    pub grub: bool,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self {
            heads: 64,
            sectors: 32,
            entry: None,
            offset: 0,
            partition_type: 0x17,
            id: None,
            hd0: Hd0Mode::Off,
            partok: false,
            uefi: false,
            mac: false,
            gpt: false,
            mbr: false,
            no_mbr: false,
            no_code: false,
            no_chs: false,
            size: None,
            legacy: true,
            mbr_file: None,
            boot_code_table: None,
            grub: false,
        }
    }
}

impl HybridOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.heads) {
            return Err(Error::invalid_option(format!(
                "invalid head: `{}', 1 <= head <= 256",
                self.heads
            )));
        }
        if !(1..=63).contains(&self.sectors) {
            return Err(Error::invalid_option(format!(
                "invalid sector: `{}', 1 <= sector <= 63",
                self.sectors
            )));
        }
        if let Some(entry) = self.entry {
            if !(1..=4).contains(&entry) {
                return Err(Error::invalid_option(format!(
                    "invalid entry: `{}', 1 <= entry <= 4",
                    entry
                )));
            }
        }
        if self.partition_type > 255 {
            return Err(Error::invalid_option(format!(
                "invalid type: `{}', 0 <= type <= 255",
                self.partition_type
            )));
        }
        Ok(())
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.heads, self.sectors)
    }

    /// Tables to write; MBR when neither is asked for
    pub fn table_mode(&self) -> TableMode {
        TableMode {
            gpt: self.gpt,
            mbr: self.mbr || !self.gpt,
        }
    }

    /// MBR type of the data partition; 0 when EFI is requested without an offset
    pub fn data_partition_type(&self) -> u8 {
        if self.uefi && self.offset == 0 {
            0
        } else {
            self.partition_type as u8
        }
    }

    /// Partition slots before the catalog is known
    pub fn partition_numbers(&self) -> PartitionNumbers {
        let mut numbers = PartitionNumbers {
            data: 1,
            efi: if self.uefi { Some(2) } else { None },
            mac: if self.mac { Some(3) } else { None },
        };

        if let Some(entry) = self.entry.map(usize::from) {
            if Some(entry) != numbers.efi && Some(entry) != numbers.mac {
                numbers.data = entry;
            }
        }
        numbers
    }
}

/// Which partition tables are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableMode {
    pub gpt: bool,
    /// Native MBR entries; in GPT-only mode the MBR holds a protective entry
    pub mbr: bool,
}

/// 1-based table slots of the hybrid partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionNumbers {
    pub data: usize,
    pub efi: Option<usize>,
    pub mac: Option<usize>,
}

impl PartitionNumbers {
    /// Put the EFI partition first when the data partition starts after it
    pub fn reorder_for_offset(&mut self, offset: u32, efi_lba: u32) {
        if offset == 0 || efi_lba == 0 || offset as u64 <= efi_lba as u64 * 4 {
            return;
        }

        self.efi = Some(1);
        self.data = 2;
        if self.mac.is_some() {
            self.mac = Some(2);
            self.data = 3;
        }
    }
}
