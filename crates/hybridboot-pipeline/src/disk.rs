//! Disk with a sparse chunk cache

use hybridboot_core::{
    checked_multiply_u64, validate_allocation_size, validate_block_size, Error, ReadSeek, Result,
    MAX_ALLOCATION_SIZE,
};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Where a disk's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskSource {
    /// A real file or device
    File,
    /// No backing store; every uncached byte is zero
    Synthetic,
    /// Chunks loaded from a dump; everything else is zero
    Imported,
}

/// A logical block device
///
/// Reads go through a cache of `chunk_size` byte chunks keyed by chunk number.
/// Chunks that were never read or stored are implicitly zero.
///
/// The block size starts at 512 and can be switched to any power of two up to
/// 4096 while probing; the chunk size stays fixed and always divides it.
pub struct Disk {
    name: String,
    index: usize,
    backing: Option<Box<dyn ReadSeek>>,
    source: DiskSource,
    size_in_bytes: u64,
    block_size: u32,
    chunk_size: u32,
    chunks: BTreeMap<u64, Vec<u8>>,
}

impl Disk {
    /// Default block and chunk size
    pub const SECTOR_SIZE: u32 = 512;

    /// Open a disk image file read-only
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self::from_reader(path.display().to_string(), file, size))
    }

    /// Wrap any seekable stream
    pub fn from_reader<R>(name: impl Into<String>, reader: R, size: u64) -> Self
    where
        R: ReadSeek + 'static,
    {
        Self {
            name: name.into(),
            index: 0,
            backing: Some(Box::new(reader)),
            source: DiskSource::File,
            size_in_bytes: size,
            block_size: Self::SECTOR_SIZE,
            chunk_size: Self::SECTOR_SIZE,
            chunks: BTreeMap::new(),
        }
    }

    /// A disk with no backing store
    pub fn synthetic(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            index: 0,
            backing: None,
            source: DiskSource::Synthetic,
            size_in_bytes: size,
            block_size: Self::SECTOR_SIZE,
            chunk_size: Self::SECTOR_SIZE,
            chunks: BTreeMap::new(),
        }
    }

    /// A disk populated from a dump file
    pub(crate) fn imported(name: String, index: usize, size: u64) -> Self {
        let mut disk = Self::synthetic(name, size);
        disk.index = index;
        disk.source = DiskSource::Imported;
        disk
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of this disk in the run
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn source(&self) -> DiskSource {
        self.source
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.size_in_bytes
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Number of whole blocks at the current block size
    pub fn block_count(&self) -> u64 {
        self.size_in_bytes / self.block_size as u64
    }

    /// Switch the logical block size
    ///
    /// Cached chunks stay valid; only the block to chunk mapping changes.
    pub fn set_block_size(&mut self, block_size: u32) -> Result<()> {
        validate_block_size(block_size)?;
        if block_size % self.chunk_size != 0 {
            return Err(Error::invalid_option(format!(
                "block size {} is not a multiple of chunk size {}",
                block_size, self.chunk_size
            )));
        }
        self.block_size = block_size;
        Ok(())
    }

    /// Read `count` blocks starting at `block`
    ///
    /// Returns exactly `count * block_size` bytes. A cache miss on a disk
    /// without backing store yields zeros and is not cached.
    pub fn read(&mut self, block: u64, count: u32) -> Result<Vec<u8>> {
        let factor = (self.block_size / self.chunk_size) as u64;
        let chunk_size = self.chunk_size as usize;

        let total = validate_allocation_size(
            count as u64 * self.block_size as u64,
            MAX_ALLOCATION_SIZE,
            "disk read",
        )?;
        let mut buffer = vec![0u8; total];

        let first_chunk = checked_multiply_u64(block, factor, "block address")?;

        for (i, out) in buffer.chunks_exact_mut(chunk_size).enumerate() {
            let chunk_nr = first_chunk + i as u64;
            if let Some(cached) = self.chunks.get(&chunk_nr) {
                out.copy_from_slice(cached);
                continue;
            }

            if self.read_chunk(chunk_nr, out)? {
                self.store_chunk(chunk_nr, out.to_vec());
            }
        }

        Ok(buffer)
    }

    /// Fill `out` from the backing store; `false` if there is none
    fn read_chunk(&mut self, chunk_nr: u64, out: &mut [u8]) -> Result<bool> {
        let Some(backing) = self.backing.as_mut() else {
            tracing::debug!("{}: chunk {} not stored, reading zeros", self.name, chunk_nr);
            out.fill(0);
            return Ok(false);
        };

        let offset = chunk_nr * self.chunk_size as u64;
        tracing::debug!("{}: cache miss at 0x{:08x}", self.name, offset);

        backing
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io_at("seek", offset, e))?;
        backing
            .read_exact(out)
            .map_err(|e| Error::io_at("read", offset, e))?;

        Ok(true)
    }

    /// Store a chunk, replacing any previous content for that chunk number
    pub fn store_chunk(&mut self, chunk_nr: u64, mut data: Vec<u8>) {
        data.resize(self.chunk_size as usize, 0);
        tracing::debug!(
            "{}: cache store at 0x{:08x}",
            self.name,
            chunk_nr * self.chunk_size as u64
        );
        self.chunks.insert(chunk_nr, data);
    }

    /// Cached chunk content, if any
    pub fn cached_chunk(&self, chunk_nr: u64) -> Option<&[u8]> {
        self.chunks.get(&chunk_nr).map(Vec::as_slice)
    }

    /// All cached chunks in ascending chunk order
    pub fn cached_chunks(&self) -> impl Iterator<Item = (u64, &[u8])> {
        self.chunks.iter().map(|(nr, data)| (*nr, data.as_slice()))
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disk")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("source", &self.source)
            .field("size_in_bytes", &self.size_in_bytes)
            .field("block_size", &self.block_size)
            .field("cached_chunks", &self.chunks.len())
            .finish()
    }
}
