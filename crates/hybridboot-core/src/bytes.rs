//! Endian-explicit field access on raw sector buffers
//!
//! Every on-disk structure in this workspace is decoded through these helpers
//! at fixed offsets; nothing relies on in-memory struct layout, so the results
//! do not depend on the host byte order.
//!
//! Callers are responsible for passing buffers that contain the whole field.

#[inline]
pub fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
pub fn read_u16_be(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
pub fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[inline]
pub fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[inline]
pub fn read_u64_le(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

#[inline]
pub fn read_u64_be(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(raw)
}

#[inline]
pub fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_u16_be(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_u32_be(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

#[inline]
pub fn write_u64_le(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Copy a 16-byte field out of a buffer
#[inline]
pub fn read_array16(buf: &[u8], offset: usize) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&buf[offset..offset + 16]);
    out
}

/// Decode a fixed-size C string field
///
/// The field is cut at the first NUL, and trailing NUL, space, tab and newline
/// characters are trimmed. Non-UTF-8 bytes are replaced.
pub fn c_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let text = String::from_utf8_lossy(&field[..end]);
    text.trim_end_matches(['\0', ' ', '\t', '\n']).to_string()
}

/// Store `text` into a fixed-size field, NUL padded
///
/// Text longer than the field is truncated; a terminating NUL is only present
/// when there is room for it.
pub fn write_c_string(field: &mut [u8], text: &str) {
    field.fill(0);
    let bytes = text.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
}

/// True when every byte of `buf` is zero
#[inline]
pub fn is_zero(buf: &[u8]) -> bool {
    buf.iter().all(|&b| b == 0)
}

/// Find `needle` anywhere in `haystack`
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_order_reads() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_u16_le(&buf, 0), 0x0201);
        assert_eq!(read_u16_be(&buf, 0), 0x0102);
        assert_eq!(read_u32_le(&buf, 4), 0x0807_0605);
        assert_eq!(read_u32_be(&buf, 4), 0x0506_0708);
        assert_eq!(read_u64_le(&buf, 0), 0x0807_0605_0403_0201);
        assert_eq!(read_u64_be(&buf, 0), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_writes_match_reads() {
        let mut buf = [0u8; 8];
        write_u32_be(&mut buf, 0, 0x504D_0000);
        assert_eq!(&buf[..2], b"PM");
        write_u64_le(&mut buf, 0, 0x5452_4150_2049_4645);
        assert_eq!(&buf, b"EFI PART");
    }

    #[test]
    fn test_c_string_trims_padding() {
        assert_eq!(c_string(b"Apple_HFS\0\0\0\0"), "Apple_HFS");
        assert_eq!(c_string(b"ISO  \t\n"), "ISO");
        assert_eq!(c_string(b"\0garbage"), "");
    }

    #[test]
    fn test_write_c_string_pads() {
        let mut field = [0xFFu8; 8];
        write_c_string(&mut field, "EFI");
        assert_eq!(&field, b"EFI\0\0\0\0\0");
    }

    #[test]
    fn test_contains() {
        assert!(contains(b"xxisolinux.binyy", b"isolinux.bin"));
        assert!(!contains(b"GRU", b"GRUB"));
    }
}
