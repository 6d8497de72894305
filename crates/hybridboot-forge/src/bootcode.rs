//! MBR boot code sources

use crate::options::{HybridOptions, Hd0Mode};
use hybridboot_core::{Error, Result};
use hybridboot_zones::MbrTable;
use std::fs;
use std::path::Path;

const CODE_SIZE: usize = MbrTable::BOOT_CODE_SIZE;

/// Six boot code variants, one per hd0 mode with and without partok
///
/// Entry `hd0 + 3 * partok` is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootCodeTable {
    entries: Vec<[u8; CODE_SIZE]>,
}

impl BootCodeTable {
    pub const ENTRIES: usize = 6;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::ENTRIES * CODE_SIZE {
            return Err(Error::invalid_option(format!(
                "boot code table must be {} bytes, got {}",
                Self::ENTRIES * CODE_SIZE,
                bytes.len()
            )));
        }

        let entries = bytes
            .chunks_exact(CODE_SIZE)
            .map(|chunk| {
                let mut code = [0u8; CODE_SIZE];
                code.copy_from_slice(chunk);
                code
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_bytes(&fs::read(path)?)
    }

    pub fn entry(&self, hd0: Hd0Mode, partok: bool) -> [u8; CODE_SIZE] {
        self.entries[hd0.index() + 3 * partok as usize]
    }
}

/// First 432 bytes of a user-supplied MBR file
pub fn load_mbr_file(path: &Path) -> Result<[u8; CODE_SIZE]> {
    let bytes = fs::read(path)?;
    if bytes.len() < CODE_SIZE {
        return Err(Error::invalid_option(format!(
            "{}: failed to read MBR",
            path.display()
        )));
    }
    let mut code = [0u8; CODE_SIZE];
    code.copy_from_slice(&bytes[..CODE_SIZE]);
    Ok(code)
}

/// Boot code for the options: the MBR file, else the table entry, else zeros
pub fn resolve_boot_code(options: &HybridOptions) -> Result<[u8; CODE_SIZE]> {
    if let Some(path) = &options.mbr_file {
        return load_mbr_file(path);
    }
    if let Some(path) = &options.boot_code_table {
        let table = BootCodeTable::load(path)?;
        return Ok(table.entry(options.hd0, options.partok));
    }

    tracing::warn!("no boot code given, MBR boot code left empty");
    Ok([0u8; CODE_SIZE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table_bytes() -> Vec<u8> {
        (0..BootCodeTable::ENTRIES)
            .flat_map(|i| std::iter::repeat(i as u8 + 1).take(CODE_SIZE))
            .collect()
    }

    #[test]
    fn test_table_entry_index() {
        let table = BootCodeTable::from_bytes(&table_bytes()).unwrap();
        assert_eq!(table.entry(Hd0Mode::Off, false)[0], 1);
        assert_eq!(table.entry(Hd0Mode::Ctrl, false)[0], 3);
        assert_eq!(table.entry(Hd0Mode::Off, true)[0], 4);
        assert_eq!(table.entry(Hd0Mode::Ctrl, true)[431], 6);
    }

    #[test]
    fn test_table_size_checked() {
        assert!(BootCodeTable::from_bytes(&[0u8; 432]).is_err());
    }

    #[test]
    fn test_resolve_sources() {
        let mut mbr = tempfile::NamedTempFile::new().unwrap();
        mbr.write_all(&[0x33; 512]).unwrap();
        let mut table = tempfile::NamedTempFile::new().unwrap();
        table.write_all(&table_bytes()).unwrap();

        let options = HybridOptions {
            mbr_file: Some(mbr.path().to_path_buf()),
            boot_code_table: Some(table.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(resolve_boot_code(&options).unwrap(), [0x33; CODE_SIZE]);

        let options = HybridOptions {
            boot_code_table: Some(table.path().to_path_buf()),
            hd0: Hd0Mode::Force,
            ..Default::default()
        };
        assert_eq!(resolve_boot_code(&options).unwrap(), [2; CODE_SIZE]);

        assert_eq!(
            resolve_boot_code(&HybridOptions::default()).unwrap(),
            [0; CODE_SIZE]
        );
    }

    #[test]
    fn test_short_mbr_file() {
        let mut mbr = tempfile::NamedTempFile::new().unwrap();
        mbr.write_all(&[0x33; 100]).unwrap();
        let err = load_mbr_file(mbr.path()).unwrap_err();
        assert!(err.to_string().contains("failed to read MBR"));
    }
}
