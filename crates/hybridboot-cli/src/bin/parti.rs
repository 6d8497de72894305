//! parti - show the partition tables of disk images

use anyhow::{bail, Context, Result};
use clap::Parser;
use hybridboot_cli::init_logging;
use hybridboot_core::NoNames;
use hybridboot_inspect::{CollectingSink, InspectOptions, Inspector, TextSink};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parti")]
#[command(about = "Show MBR, GPT and Apple partition tables of disk images", long_about = None)]
#[command(version)]
struct Cli {
    /// Disk images to inspect
    images: Vec<PathBuf>,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,

    /// Show extended partition links and table references
    #[arg(short, long)]
    verbose: bool,

    /// Print MBR addresses relative to their base
    #[arg(long)]
    raw: bool,

    /// Add the disks recorded in a dump file
    #[arg(long, value_name = "FILE")]
    import_disk: Vec<PathBuf>,

    /// Write every sector read to a dump file
    #[arg(long, value_name = "FILE")]
    export_disk: Option<PathBuf>,

    /// Skip the MBR probe
    #[arg(long)]
    no_mbr: bool,

    /// Skip the GPT probe
    #[arg(long)]
    no_gpt: bool,

    /// Skip the Apple partition map probe
    #[arg(long)]
    no_apple: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let options = InspectOptions {
        verbose: cli.verbose,
        raw: cli.raw,
        mbr: !cli.no_mbr,
        gpt: !cli.no_gpt,
        apm: !cli.no_apple,
    };
    let mut inspector = Inspector::new(options);

    for dump in &cli.import_disk {
        inspector
            .import(dump)
            .with_context(|| format!("{}: import failed", dump.display()))?;
    }
    for image in &cli.images {
        inspector
            .open(image)
            .with_context(|| format!("{}: failed to open", image.display()))?;
    }
    if inspector.disks().is_empty() {
        bail!("no disks given");
    }

    if cli.json {
        let mut sink = CollectingSink::new();
        inspector.run(&mut sink, &mut NoNames)?;
        println!("{}", sink.to_json()?);
    } else {
        let stdout = io::stdout();
        let mut sink = TextSink::new(stdout.lock(), options);
        inspector.run(&mut sink, &mut NoNames)?;
        sink.into_inner().flush()?;
    }

    if let Some(path) = &cli.export_disk {
        inspector
            .export(path)
            .with_context(|| format!("{}: export failed", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_is_a_flag() {
        let cli = Cli::try_parse_from(["parti", "-v", "disk.img"]).unwrap();
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["parti", "disk.img"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.log_level, "warn");
    }
}
