//! # hybridboot inspect
//!
//! Read-only probing of disk images for MBR, GPT and Apple partition maps.
//!
//! Each disk yields one [`DiskReport`] handed to a [`ReportSink`]. Structural
//! problems are fields of the report; I/O failures are recorded per disk.
//!
//! ```rust
//! use hybridboot_core::NoNames;
//! use hybridboot_inspect::{CollectingSink, InspectOptions, Inspector};
//! use hybridboot_pipeline::Disk;
//!
//! let mut inspector = Inspector::new(InspectOptions::default());
//! inspector.add_disk(Disk::synthetic("blank", 1024 * 1024));
//!
//! let mut sink = CollectingSink::new();
//! inspector.run(&mut sink, &mut NoNames).unwrap();
//! assert!(sink.reports[0].is_empty());
//! ```

pub mod inspector;
pub mod report;
pub mod sink;

pub use inspector::{inspect_disk, InspectOptions, Inspector};
pub use report::DiskReport;
pub use sink::{CollectingSink, ReportSink, TextSink};
