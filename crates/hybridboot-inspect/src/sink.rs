//! Destinations for disk reports

use crate::inspector::InspectOptions;
use crate::report::DiskReport;
use hybridboot_core::Result;
use std::io::Write;

/// Receives one report per inspected disk, in disk order
pub trait ReportSink {
    fn report(&mut self, report: DiskReport) -> Result<()>;
}

/// Keeps every report for later rendering
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub reports: Vec<DiskReport>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports as one JSON array
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.reports)
            .map_err(|e| hybridboot_core::Error::custom(format!("json: {}", e)))
    }
}

impl ReportSink for CollectingSink {
    fn report(&mut self, report: DiskReport) -> Result<()> {
        self.reports.push(report);
        Ok(())
    }
}

/// Renders each report as text as soon as it arrives
pub struct TextSink<W: Write> {
    out: W,
    options: InspectOptions,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, options: InspectOptions) -> Self {
        Self { out, options }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn report(&mut self, report: DiskReport) -> Result<()> {
        report.write_text(&self.options, &mut self.out)?;
        Ok(())
    }
}
