//! # hybridboot core
//!
//! Shared primitives for building and inspecting hybrid ISO boot images.
//!
//! This crate provides the foundation the other crates build on:
//! - **Bytes**: little/big-endian field readers and writers
//! - **CRC32**: the checksum used by GPT headers and partition arrays
//! - **GUIDs**: mixed-endian on-disk GUIDs and their canonical form
//! - **Traits**: collaborator interfaces (boot catalog, name lookup, zone tables)
//! - **Limits**: allocation and traversal ceilings for untrusted images
//!
//! ## Example
//!
//! ```rust
//! use hybridboot_core::{crc32, Guid};
//!
//! assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
//!
//! let guid = Guid::from_canonical([
//!     0xC1, 0x2A, 0x73, 0x28, 0xF8, 0x1F, 0x11, 0xD2,
//!     0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B,
//! ]);
//! assert_eq!(guid.to_string(), "c12a7328-f81f-11d2-ba4b-00a0c93ec93b");
//! ```

pub mod bytes;
pub mod crc;
pub mod error;
pub mod guid;
pub mod security;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use crc::{crc32, gpt_header_crc32};
pub use error::{Error, Result};
pub use guid::{swap_mixed_endian, Guid};
pub use security::*;
pub use traits::{
    BootCatalogProvider, BootImage, BootImages, NameResolver, NoNames, ReadSeek,
    ZoneTable,
};
pub use types::Zone;
