//! CRC32 as used by GPT
//!
//! Reflected polynomial 0xEDB88320, initial value 0xFFFFFFFF, final XOR
//! 0xFFFFFFFF. `crc32fast` implements exactly this variant.

/// Compute the CRC32 of `data`
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Compute a GPT header CRC32 over the first `header_size` bytes of `header`
/// with the stored CRC field (bytes 16..20) treated as zero.
///
/// Returns `None` when the header buffer is shorter than `header_size` or the
/// size cannot even hold the CRC field.
pub fn gpt_header_crc32(header: &[u8], header_size: usize) -> Option<u32> {
    if header_size < 20 || header.len() < header_size {
        return None;
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[..16]);
    hasher.update(&[0u8; 4]);
    hasher.update(&header[20..header_size]);
    Some(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b"The quick brown fox jumps over the lazy dog"), 0x414F_A339);
    }

    #[test]
    fn test_header_crc_ignores_stored_field() {
        let mut header = [0u8; 92];
        header[..8].copy_from_slice(b"EFI PART");
        let clean = gpt_header_crc32(&header, 92).unwrap();

        header[16..20].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(gpt_header_crc32(&header, 92), Some(clean));

        let mut zeroed = header;
        zeroed[16..20].fill(0);
        assert_eq!(crc32(&zeroed), clean);
    }

    #[test]
    fn test_header_crc_rejects_short_buffer() {
        assert_eq!(gpt_header_crc32(&[0u8; 50], 92), None);
        assert_eq!(gpt_header_crc32(&[0u8; 50], 12), None);
    }
}
