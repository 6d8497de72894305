//! # hybridboot forge
//!
//! Turns an El Torito ISO into a hybrid image that also boots from a disk.
//!
//! - **El Torito**: volume size and boot catalog decoding
//! - **Boot code**: MBR boot code from a file or a six-entry table
//! - **Builder**: MBR, GPT and APM written into the ISO system area
//!
//! ```rust,no_run
//! use hybridboot_forge::{HybridBuilder, HybridOptions};
//!
//! let mut iso = std::fs::OpenOptions::new()
//!     .read(true)
//!     .write(true)
//!     .open("boot.iso")?;
//! let options = HybridOptions { uefi: true, gpt: true, ..Default::default() };
//! let report = HybridBuilder::new(options).build(&mut iso)?;
//! println!("{} bytes", report.iso_filesize);
//! # Ok::<(), hybridboot_core::Error>(())
//! ```

pub mod bootcode;
pub mod builder;
pub mod eltorito;
pub mod image;
pub mod options;

pub use bootcode::BootCodeTable;
pub use builder::{BuildReport, HybridBuilder};
pub use eltorito::{CatalogRecord, IsoBootCatalog, PrimaryVolume};
pub use image::ImageFile;
pub use options::{Hd0Mode, HybridOptions, PartitionNumbers, TableMode};
