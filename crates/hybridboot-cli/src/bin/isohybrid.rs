//! isohybrid - make an El Torito ISO bootable from a disk

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use hybridboot_cli::{init_logging, parse_number};
use hybridboot_forge::{Hd0Mode, HybridBuilder, HybridOptions};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "isohybrid")]
#[command(about = "Post-process an ISO image so it also boots as a hard disk", long_about = None)]
#[command(version, disable_help_flag = true)]
struct Cli {
    /// ISO image, modified in place
    image: PathBuf,

    /// Number of default geometry heads
    #[arg(short = 'h', value_parser = parse_number)]
    heads: Option<u32>,

    /// Number of default geometry sectors
    #[arg(short = 's', value_parser = parse_number)]
    sectors: Option<u32>,

    /// Partition entry number (1-4)
    #[arg(short, long, value_parser = parse_number)]
    entry: Option<u32>,

    /// Partition offset in 512-byte units
    #[arg(short, long, value_parser = parse_number)]
    offset: Option<u32>,

    /// Partition type (default 0x17)
    #[arg(short = 't', long = "type", value_parser = parse_number)]
    partition_type: Option<u32>,

    /// MBR id (default: keep the existing one, else random)
    #[arg(short, long, value_parser = parse_number)]
    id: Option<u32>,

    /// Build an EFI bootable image
    #[arg(short, long)]
    uefi: bool,

    /// Add Apple partition map support
    #[arg(short, long)]
    mac: bool,

    /// Write a GPT
    #[arg(long)]
    gpt: bool,

    /// Write a native MBR (default unless --gpt)
    #[arg(long)]
    mbr: bool,

    /// Don't write the protective MBR for GPT
    #[arg(long)]
    no_mbr: bool,

    /// Don't include MBR boot code
    #[arg(long)]
    no_code: bool,

    /// Don't fill in CHS values, use 0xffffff instead
    #[arg(long)]
    no_chs: bool,

    /// Disk size to assume when writing the MBR, in 512-byte units
    #[arg(long, value_parser = parse_number)]
    size: Option<u32>,

    /// Expect an El Torito boot record (default)
    #[arg(long, overrides_with = "no_legacy")]
    legacy: bool,

    /// Do not expect an El Torito boot record
    #[arg(long)]
    no_legacy: bool,

    /// Use the first 432 bytes of FILE as MBR boot code
    #[arg(long, value_name = "FILE")]
    mbr_file: Option<PathBuf>,

    /// Boot code table of six 432-byte entries
    #[arg(long, value_name = "FILE")]
    boot_code_table: Option<PathBuf>,

    /// GRUB mode
    #[arg(long)]
    grub: bool,

    /// Assume we are loaded as disk ID 0
    #[arg(short = 'f', long)]
    forcehd0: bool,

    /// Assume disk ID 0 if the Ctrl key is pressed
    #[arg(short = 'c', long, conflicts_with = "forcehd0")]
    ctrlhd0: bool,

    /// Allow booting from within a partition
    #[arg(short = 'p', long)]
    partok: bool,

    /// JSON file with base options; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the build report as JSON
    #[arg(long)]
    json: bool,

    /// Display verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Display this help
    #[arg(short = '?', long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn options(&self) -> Result<HybridOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("{}: failed to read config", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("{}: invalid config", path.display()))?
            }
            None => HybridOptions::default(),
        };

        if let Some(heads) = self.heads {
            options.heads = heads;
        }
        if let Some(sectors) = self.sectors {
            options.sectors = sectors;
        }
        if let Some(entry) = self.entry {
            if !(1..=4).contains(&entry) {
                bail!("invalid entry: `{}', 1 <= entry <= 4", entry);
            }
            options.entry = Some(entry as u8);
        }
        if let Some(offset) = self.offset {
            options.offset = offset;
        }
        if let Some(partition_type) = self.partition_type {
            if partition_type > 255 {
                bail!("invalid type: `{}', 0 <= type <= 255", partition_type);
            }
            options.partition_type = partition_type as u16;
        }
        if self.id.is_some() {
            options.id = self.id;
        }
        if self.size.is_some() {
            options.size = self.size;
        }
        if self.mbr_file.is_some() {
            options.mbr_file = self.mbr_file.clone();
        }
        if self.boot_code_table.is_some() {
            options.boot_code_table = self.boot_code_table.clone();
        }

        options.uefi |= self.uefi;
        options.mac |= self.mac;
        options.gpt |= self.gpt;
        options.mbr |= self.mbr;
        options.no_mbr |= self.no_mbr;
        options.no_code |= self.no_code;
        options.no_chs |= self.no_chs;
        options.grub |= self.grub;
        options.partok |= self.partok;

        if self.legacy {
            options.legacy = true;
        }
        if self.no_legacy {
            options.legacy = false;
        }
        if self.forcehd0 {
            options.hd0 = Hd0Mode::Force;
        }
        if self.ctrlhd0 {
            options.hd0 = Hd0Mode::Ctrl;
        }

        options.validate()?;
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| if cli.verbose { "info" } else { "warn" }.to_string());
    init_logging(&level);

    let options = cli.options()?;
    tracing::debug!("options: {:?}", options);

    let mut image = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&cli.image)
        .with_context(|| format!("{}: failed to open", cli.image.display()))?;

    let report = HybridBuilder::new(options)
        .build(&mut image)
        .with_context(|| format!("{}", cli.image.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if cli.verbose {
        println!("catalogue offset: {:?}", report.boot_images.catalog_lba);
        println!("imgsize: {}, padding: {}", report.iso_filesize, report.padding);
        println!("id: {}", report.disk_id);
    }

    Ok(())
}
