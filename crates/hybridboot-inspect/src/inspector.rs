//! Probe disks for partition tables

use crate::report::DiskReport;
use crate::sink::ReportSink;
use hybridboot_core::{NameResolver, Result};
use hybridboot_pipeline::{export_disks_to_file, import_disks_from_file, Disk};
use hybridboot_zones::{ApmMap, GptProbe, MbrTable};
use std::path::Path;

/// What to probe for and how to render it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectOptions {
    /// Show extended chain links and table references
    pub verbose: bool,
    /// Show MBR addresses relative to their base
    pub raw: bool,
    pub mbr: bool,
    pub gpt: bool,
    pub apm: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            raw: false,
            mbr: true,
            gpt: true,
            apm: true,
        }
    }
}

/// A set of disks inspected in one run
pub struct Inspector {
    options: InspectOptions,
    disks: Vec<Disk>,
}

impl Inspector {
    pub fn new(options: InspectOptions) -> Self {
        Self {
            options,
            disks: Vec::new(),
        }
    }

    pub fn options(&self) -> &InspectOptions {
        &self.options
    }

    /// Append a disk; it is numbered by its position in the run
    pub fn add_disk(&mut self, mut disk: Disk) {
        disk.set_index(self.disks.len());
        self.disks.push(disk);
    }

    /// Open an image file
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let disk = Disk::open(path)?;
        self.add_disk(disk);
        Ok(())
    }

    /// Add every disk recorded in a dump file, returning how many
    pub fn import(&mut self, path: &Path) -> Result<usize> {
        let disks = import_disks_from_file(path)?;
        let count = disks.len();
        for disk in disks {
            self.add_disk(disk);
        }
        Ok(count)
    }

    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    /// Probe every disk and hand each report to `sink`
    pub fn run(&mut self, sink: &mut dyn ReportSink, names: &mut dyn NameResolver) -> Result<()> {
        for disk in &mut self.disks {
            let report = inspect_disk(disk, &self.options, names);
            sink.report(report)?;
        }
        Ok(())
    }

    /// Write the chunks read so far to a dump file
    pub fn export(&self, path: &Path) -> Result<()> {
        export_disks_to_file(&self.disks, path)?;
        tracing::info!("{} disk(s) exported to {}", self.disks.len(), path.display());
        Ok(())
    }
}

/// Probe one disk
///
/// A probe that fails with an I/O error is recorded in the report and the
/// remaining probes still run.
pub fn inspect_disk(
    disk: &mut Disk,
    options: &InspectOptions,
    names: &mut dyn NameResolver,
) -> DiskReport {
    let mut report = DiskReport::new(disk);
    tracing::debug!("{}: {} bytes", disk.name(), disk.size_in_bytes());

    if options.mbr {
        match MbrTable::decode(disk, names) {
            Ok(mbr) => report.mbr = mbr,
            Err(e) => record(&mut report, "mbr", e),
        }
    }

    if options.gpt {
        match GptProbe::probe(disk) {
            Ok(found) => report.gpt = found,
            Err(e) => record(&mut report, "gpt", e),
        }
    }

    if options.apm {
        match ApmMap::decode(disk) {
            Ok(apple) => report.apple = apple,
            Err(e) => record(&mut report, "apple", e),
        }
    }

    if report.is_empty() {
        tracing::info!("{}: no partition table", disk.name());
    }
    report
}

fn record(report: &mut DiskReport, probe: &str, error: hybridboot_core::Error) {
    tracing::warn!("{}: {}: {}", report.name, probe, error);
    report.errors.push(format!("{}: {}", probe, error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use hybridboot_core::NoNames;
    use std::io::{self, Read, Seek, SeekFrom};

    /// Stream that fails every read
    struct Unreadable;

    impl Read for Unreadable {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "bad sector"))
        }
    }

    impl Seek for Unreadable {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    fn mbr_disk() -> Disk {
        let mut sector = vec![0u8; 512];
        sector[440..444].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        // one entry at 2048, 4096 sectors, geometry 255/63
        sector[446..462].copy_from_slice(&[
            0x80, 0x20, 0x21, 0x00, 0x83, 0x41, 0x05, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x10,
            0x00, 0x00,
        ]);
        sector[510] = 0x55;
        sector[511] = 0xAA;

        let mut disk = Disk::synthetic("mbr", 8 * 1024 * 1024);
        disk.store_chunk(0, sector);
        disk
    }

    #[test]
    fn test_inspect_mbr_disk() {
        let mut disk = mbr_disk();
        let report = inspect_disk(&mut disk, &InspectOptions::default(), &mut NoNames);

        let mbr = report.mbr.as_ref().unwrap();
        assert_eq!(mbr.disk_id, 0xDEADBEEF);
        assert_eq!(mbr.partitions[0].first_lba, 2048);
        assert_eq!(mbr.partitions[0].size, 4096);
        assert!(report.gpt.is_empty());
        assert!(report.apple.is_none());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_probes_can_be_disabled() {
        let mut disk = mbr_disk();
        let options = InspectOptions {
            mbr: false,
            ..Default::default()
        };
        let report = inspect_disk(&mut disk, &options, &mut NoNames);
        assert!(report.mbr.is_none());
        assert!(report.is_empty());
    }

    #[test]
    fn test_read_errors_are_per_disk() {
        let mut inspector = Inspector::new(InspectOptions::default());
        inspector.add_disk(Disk::from_reader("bad", Unreadable, 1024 * 1024));
        inspector.add_disk(mbr_disk());

        let mut sink = CollectingSink::new();
        inspector.run(&mut sink, &mut NoNames).unwrap();

        assert_eq!(sink.reports.len(), 2);
        assert!(sink.reports[0].errors.iter().any(|e| e.starts_with("mbr:")));
        assert_eq!(sink.reports[1].index, 1);
        assert!(sink.reports[1].mbr.is_some());
    }

    #[test]
    fn test_export_and_import() {
        let mut inspector = Inspector::new(InspectOptions::default());
        inspector.add_disk(mbr_disk());
        inspector.run(&mut CollectingSink::new(), &mut NoNames).unwrap();

        let dump = tempfile::NamedTempFile::new().unwrap();
        inspector.export(dump.path()).unwrap();

        let mut replay = Inspector::new(InspectOptions::default());
        assert_eq!(replay.import(dump.path()).unwrap(), 1);
        let mut sink = CollectingSink::new();
        replay.run(&mut sink, &mut NoNames).unwrap();

        let mbr = sink.reports[0].mbr.as_ref().unwrap();
        assert_eq!(mbr.disk_id, 0xDEADBEEF);
        assert_eq!(sink.reports[0].source, "imported");
    }
}
