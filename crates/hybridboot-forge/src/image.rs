//! Positioned access to the image being converted

use hybridboot_core::{Error, Result};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// An image file the builder can read, patch and resize in place
pub trait ImageFile: Read + Write + Seek {
    /// Current length in bytes
    fn image_len(&mut self) -> std::io::Result<u64>;

    /// Truncate or zero-extend to `len` bytes
    fn set_image_len(&mut self, len: u64) -> std::io::Result<()>;
}

impl ImageFile for File {
    fn image_len(&mut self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_image_len(&mut self, len: u64) -> std::io::Result<()> {
        self.sync_data()?;
        self.set_len(len)
    }
}

impl ImageFile for Cursor<Vec<u8>> {
    fn image_len(&mut self) -> std::io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn set_image_len(&mut self, len: u64) -> std::io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "image too large"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

/// Fill `buf` from byte `offset`
pub fn read_at<R: Read + Seek + ?Sized>(reader: &mut R, offset: u64, buf: &mut [u8]) -> Result<()> {
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| Error::io_at("seek", offset, e))?;
    reader
        .read_exact(buf)
        .map_err(|e| Error::io_at("read", offset, e))
}

/// Write all of `data` at byte `offset`
pub fn write_at<W: Write + Seek + ?Sized>(writer: &mut W, offset: u64, data: &[u8]) -> Result<()> {
    writer
        .seek(SeekFrom::Start(offset))
        .map_err(|e| Error::io_at("seek", offset, e))?;
    writer
        .write_all(data)
        .map_err(|e| Error::io_at("write", offset, e))
}
