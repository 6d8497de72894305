//! # hybridboot pipeline
//!
//! Block access for the disk inspector.
//!
//! - **Disk**: a logical block device over a file, an in-memory stream, or
//!   nothing at all, with a read-through cache of 512-byte chunks
//! - **Dump**: the text format used to export and re-import cached chunks
//!
//! ## Example
//!
//! ```rust
//! use hybridboot_pipeline::Disk;
//!
//! let mut disk = Disk::synthetic("empty", 1024 * 1024);
//! let block = disk.read(0, 1).unwrap();
//! assert_eq!(block.len(), 512);
//! assert!(block.iter().all(|&b| b == 0));
//! ```

pub mod disk;
pub mod dump;

pub use disk::{Disk, DiskSource};
pub use dump::{export_disk, export_disks_to_file, import_disks, import_disks_from_file};
