//! Text dump of cached disk chunks
//!
//! ```text
//! # disk 0, size = 11534336
//! 01b0  00 00 00 00 00 00 00 00 78 56 34 12 00 00 00 00  ........xV4.....
//! 01f0  00 00 00 00 00 00 00 00 00 00 00 00 00 00 55 aa  ..............U.
//! ```
//!
//! Each disk starts with a header line. Data lines carry a 16-byte aligned
//! address followed by sixteen hex bytes; anything after them (the ASCII
//! column) is ignored on import. All-zero ranges are not written.

use crate::disk::Disk;
use hybridboot_core::{bytes::is_zero, Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const LINE_BYTES: usize = 16;

/// Hex digits used for addresses of a disk of `size` bytes
fn address_digits(size: u64) -> usize {
    let mut max_addr = size.wrapping_sub(1);
    let mut digits = 0;
    loop {
        max_addr >>= 4;
        if max_addr == 0 {
            break;
        }
        digits += 1;
    }
    digits.max(4)
}

/// Write one disk's cached chunks
pub fn export_disk(disk: &Disk, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "# disk {}, size = {}", disk.index(), disk.size_in_bytes())?;

    let width = address_digits(disk.size_in_bytes());
    let chunk_size = disk.chunk_size() as u64;

    for (chunk_nr, data) in disk.cached_chunks() {
        for (i, line) in data.chunks_exact(LINE_BYTES).enumerate() {
            if is_zero(line) {
                continue;
            }

            let addr = chunk_nr * chunk_size + (i * LINE_BYTES) as u64;
            let mut text = format!("{:0width$x} ", addr, width = width);
            for byte in line {
                text.push_str(&format!(" {:02x}", byte));
            }
            text.push_str("  ");
            text.extend(line.iter().map(|&b| {
                if (32..0x7f).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            }));
            writeln!(out, "{}", text)?;
        }
    }

    Ok(())
}

/// Write several disks one after another
pub fn export_disks(disks: &[Disk], out: &mut dyn Write) -> Result<()> {
    for disk in disks {
        export_disk(disk, out)?;
    }
    out.flush()?;
    Ok(())
}

/// Replace `path` with a dump of `disks`
pub fn export_disks_to_file(disks: &[Disk], path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    export_disks(disks, &mut out)?;
    tracing::info!("exported {} disk(s) to {}", disks.len(), path.display());
    Ok(())
}

/// Parse `# disk <index>, size = <bytes>`
fn parse_header(line: &str) -> Option<(usize, u64)> {
    let rest = line.strip_prefix("# disk ")?;
    let (index, rest) = rest.split_once(',')?;
    let size = rest.trim_start().strip_prefix("size")?.trim_start().strip_prefix('=')?;
    Some((index.trim().parse().ok()?, size.trim().parse().ok()?))
}

/// Parse an address and sixteen hex bytes
fn parse_data(line: &str) -> Option<(u64, [u8; LINE_BYTES])> {
    let mut tokens = line.split_whitespace();
    let addr = u64::from_str_radix(tokens.next()?, 16).ok()?;
    let mut bytes = [0u8; LINE_BYTES];
    for byte in bytes.iter_mut() {
        *byte = u8::from_str_radix(tokens.next()?, 16).ok()?;
    }
    Some((addr, bytes))
}

/// Accumulates lines of one disk into whole chunks
struct ImportState {
    disk: Disk,
    chunk: Option<(u64, Vec<u8>)>,
}

impl ImportState {
    fn flush(&mut self) {
        if let Some((chunk_nr, data)) = self.chunk.take() {
            self.disk.store_chunk(chunk_nr, data);
        }
    }

    fn add_line(&mut self, addr: u64, bytes: &[u8; LINE_BYTES]) {
        let chunk_size = self.disk.chunk_size() as u64;
        let chunk_nr = addr / chunk_size;

        if self.chunk.as_ref().map(|(nr, _)| *nr) != Some(chunk_nr) {
            self.flush();
            let data = self
                .disk
                .cached_chunk(chunk_nr)
                .map(<[u8]>::to_vec)
                .unwrap_or_else(|| vec![0u8; chunk_size as usize]);
            self.chunk = Some((chunk_nr, data));
        }

        if let Some((_, data)) = self.chunk.as_mut() {
            let pos = (addr % chunk_size) as usize;
            data[pos..pos + LINE_BYTES].copy_from_slice(bytes);
        }
    }

    fn finish(mut self) -> Disk {
        self.flush();
        self.disk
    }
}

/// Read every disk recorded in a dump
///
/// `file_name` names the imported disks (`<file_name>#<index>`) and appears in
/// error messages. Blank lines are skipped; any other line that is neither a
/// header nor a valid data line aborts the import.
pub fn import_disks<R: BufRead>(reader: R, file_name: &str) -> Result<Vec<Disk>> {
    let mut disks = Vec::new();
    let mut current: Option<ImportState> = None;

    for (line_nr, line) in reader.lines().enumerate() {
        let line = line?;
        let line_nr = line_nr + 1;

        if line.trim().is_empty() {
            continue;
        }

        if let Some((index, size)) = parse_header(&line) {
            if let Some(state) = current.take() {
                disks.push(state.finish());
            }
            current = Some(ImportState {
                disk: Disk::imported(format!("{}#{}", file_name, index), index, size),
                chunk: None,
            });
            continue;
        }

        let parsed = parse_data(&line);
        match (current.as_mut(), parsed) {
            (Some(state), Some((addr, bytes)))
                if addr & 0xf == 0 && addr <= state.disk.size_in_bytes().saturating_add(16) =>
            {
                state.add_line(addr, &bytes);
            }
            _ => {
                return Err(Error::ImportParse {
                    file: file_name.to_string(),
                    line: line_nr,
                    content: line,
                });
            }
        }
    }

    if let Some(state) = current.take() {
        disks.push(state.finish());
    }

    for disk in &disks {
        tracing::info!(
            "{}: {} bytes, {} chunk(s) imported",
            disk.name(),
            disk.size_in_bytes(),
            disk.cached_chunk_count()
        );
    }

    Ok(disks)
}

/// Read every disk recorded in the dump file at `path`
pub fn import_disks_from_file(path: &Path) -> Result<Vec<Disk>> {
    let file = File::open(path)?;
    import_disks(BufReader::new(file), &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiskSource;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    fn sample_disk() -> Disk {
        let mut disk = Disk::synthetic("sample", 1 << 20);
        let mut mbr = vec![0u8; 512];
        mbr[0x1b8..0x1bc].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        mbr[510] = 0x55;
        mbr[511] = 0xaa;
        disk.store_chunk(0, mbr);

        let mut text = vec![0u8; 512];
        text[32..44].copy_from_slice(b"isolinux.bin");
        disk.store_chunk(7, text);
        disk
    }

    #[test]
    fn test_address_digits() {
        assert_eq!(address_digits(0), 15);
        assert_eq!(address_digits(1024), 4);
        assert_eq!(address_digits(1 << 20), 4);
        assert_eq!(address_digits(1 << 24), 5);
        assert_eq!(address_digits(1 << 32), 7);
    }

    #[test]
    fn test_export_format() {
        let disk = sample_disk();
        let mut out = Vec::new();
        export_disk(&disk, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# disk 0, size = 1048576");
        assert_eq!(
            lines[1],
            "01b0  00 00 00 00 00 00 00 00 78 56 34 12 00 00 00 00  ........xV4....."
        );
        assert!(lines[2].starts_with("01f0  "));
        assert!(lines[2].ends_with("U."));
        assert!(lines[3].starts_with("0e20  69 73 6f"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_export_import_reproduces_chunks() {
        let mut first = sample_disk();
        let mut second = Disk::synthetic("second", 4096);
        second.set_index(1);
        second.store_chunk(3, vec![0xEE; 512]);
        first.set_index(0);

        let mut out = Vec::new();
        export_disks(&[first, second], &mut out).unwrap();

        let disks = import_disks(Cursor::new(out), "dump.txt").unwrap();
        assert_eq!(disks.len(), 2);

        let original = sample_disk();
        let restored = &disks[0];
        assert_eq!(restored.name(), "dump.txt#0");
        assert_eq!(restored.source(), DiskSource::Imported);
        assert_eq!(restored.size_in_bytes(), 1 << 20);
        assert_eq!(restored.cached_chunk_count(), original.cached_chunk_count());
        for (nr, data) in original.cached_chunks() {
            assert_eq!(restored.cached_chunk(nr), Some(data));
        }

        assert_eq!(disks[1].name(), "dump.txt#1");
        assert_eq!(disks[1].cached_chunk(3), Some(&[0xEEu8; 512][..]));
    }

    #[test]
    fn test_import_rejects_malformed_line() {
        let text = "# disk 0, size = 4096\n0000  00 11 22\n";
        let err = import_disks(Cursor::new(text), "bad.txt").unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad.txt: line 2: invalid import data: 0000  00 11 22"
        );
    }

    #[test]
    fn test_import_rejects_unaligned_and_out_of_range() {
        let unaligned = "# disk 0, size = 4096\n0008  00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 01\n";
        assert!(import_disks(Cursor::new(unaligned), "u.txt").is_err());

        let beyond = "# disk 0, size = 4096\n2000  00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 01\n";
        assert!(import_disks(Cursor::new(beyond), "b.txt").is_err());
    }

    #[test]
    fn test_import_requires_header_first() {
        let text = "0000  00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 01\n";
        let err = import_disks(Cursor::new(text), "x.txt").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_import_merges_revisited_chunk() {
        let text = "# disk 0, size = 4096\n\
                    0000  01 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00\n\
                    0200  02 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00\n\
                    \n\
                    0010  03 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00\n";
        let disks = import_disks(Cursor::new(text), "m.txt").unwrap();
        let chunk = disks[0].cached_chunk(0).unwrap();
        assert_eq!(chunk[0], 1);
        assert_eq!(chunk[16], 3);
        assert_eq!(disks[0].cached_chunk(1).unwrap()[0], 2);
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        export_disks_to_file(&[sample_disk()], file.path()).unwrap();
        let disks = import_disks_from_file(file.path()).unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].cached_chunk_count(), 2);
    }
}
