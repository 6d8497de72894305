//! # hybridboot zones
//!
//! Partition table codecs for hybrid boot images.
//!
//! This crate decodes and encodes the three partitioning schemes a hybrid
//! ISO carries side by side:
//! - **MBR**: primary entries, the GPT protective entry, extended chains
//! - **GPT**: primary and backup headers with their partition arrays
//! - **APM**: Apple partition map entries in 2048-byte slots
//!
//! plus the CHS geometry helpers MBR entries depend on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hybridboot_core::{NoNames, ZoneTable};
//! use hybridboot_pipeline::Disk;
//! use hybridboot_zones::mbr::MbrTable;
//! use std::path::Path;
//!
//! let mut disk = Disk::open(Path::new("hybrid.iso")).unwrap();
//! if let Some(table) = MbrTable::decode(&mut disk, &mut NoNames).unwrap() {
//!     println!("Partition table: {}", table.identify());
//!     for zone in table.enumerate_zones() {
//!         println!("  {}", zone);
//!     }
//! }
//! ```

pub mod apm;
pub mod geometry;
pub mod gpt;
pub mod mbr;

pub use apm::ApmMap;
pub use geometry::{chs_to_lba, guess_geometry, offset_to_chs, Chs, Geometry, GeometryGuess};
pub use gpt::{GptProbe, GptTable};
pub use mbr::MbrTable;
