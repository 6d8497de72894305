//! Limits and validation helpers
//!
//! Disk images are untrusted input. Sizes and counts read from them are checked
//! against these ceilings before anything is allocated or traversed.

use crate::Error;

/// Block sizes probed for GPT and APM, smallest first
pub const PROBE_BLOCK_SIZES: [u32; 4] = [512, 1024, 2048, 4096];

/// Largest logical block size a disk may be switched to
pub const MAX_BLOCK_SIZE: u32 = 4096;

/// Maximum allocation size for a single buffer (256 MB)
pub const MAX_ALLOCATION_SIZE: usize = 256 * 1024 * 1024;

/// Largest GPT partition array we will read (4 MB)
pub const MAX_PARTITION_ARRAY_SIZE: usize = 4 * 1024 * 1024;

/// Maximum number of extended partition tables followed before giving up
pub const MAX_EXTENDED_CHAIN_LINKS: u32 = 10_000;

/// Validate that a size is within allocation limits
///
/// # Security
/// Prevents memory exhaustion from sizes read out of a disk image
pub fn validate_allocation_size(size: u64, limit: usize, context: &str) -> crate::Result<usize> {
    if size > limit as u64 {
        return Err(Error::limit_exceeded(format!(
            "{} size {} exceeds limit {}",
            context, size, limit
        )));
    }

    size.try_into()
        .map_err(|_| Error::limit_exceeded(format!("{} size exceeds platform limits", context)))
}

/// Safely multiply two u64 values with overflow checking
pub fn checked_multiply_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| Error::limit_exceeded(format!("{}: multiplication overflow", context)))
}

/// Validate a logical block size
///
/// Block sizes must be a power of two from 512 to [`MAX_BLOCK_SIZE`].
pub fn validate_block_size(block_size: u32) -> crate::Result<()> {
    if !(512..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(Error::invalid_option(format!(
            "Invalid block size: {} (must be 512-{})",
            block_size, MAX_BLOCK_SIZE
        )));
    }

    if !block_size.is_power_of_two() {
        return Err(Error::invalid_option(format!(
            "Block size {} is not a power of 2",
            block_size
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_allocation_size() {
        assert_eq!(validate_allocation_size(1024, MAX_ALLOCATION_SIZE, "test").unwrap(), 1024);
        assert!(validate_allocation_size(
            MAX_PARTITION_ARRAY_SIZE as u64 + 1,
            MAX_PARTITION_ARRAY_SIZE,
            "partition array"
        )
        .is_err());
    }

    #[test]
    fn test_checked_multiply() {
        assert_eq!(checked_multiply_u64(128, 128, "gpt").unwrap(), 16384);
        assert!(checked_multiply_u64(u64::MAX, 2, "overflow").is_err());
    }

    #[test]
    fn test_validate_block_size() {
        for size in PROBE_BLOCK_SIZES {
            assert!(validate_block_size(size).is_ok());
        }
        assert!(validate_block_size(0).is_err());
        assert!(validate_block_size(256).is_err());
        assert!(validate_block_size(1536).is_err());
        assert!(validate_block_size(8192).is_err());
    }
}
