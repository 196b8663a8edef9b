//! Inspection report rendering
//!
//! Text reports are the interchange format existing consumers parse, so the
//! header, finding and fallback lines are fixed strings:
//!
//! ```text
//! <sep>DuplicateStringInspector inspection<sep>
//! "string" : 4 times<sep>
//! ```
//!
//! `<sep>` is the platform line separator. JSON reports carry the same
//! findings as one object per line.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Platform line separator used to terminate every report line
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Output format for inspection reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable text format (default)
    #[default]
    Text,
    /// One JSON object per inspection
    Json,
}

/// Which inspection produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionKind {
    DuplicateStrings,
    SelfReferences,
}

impl InspectionKind {
    /// Name printed in the report header
    pub fn inspector_name(self) -> &'static str {
        match self {
            InspectionKind::DuplicateStrings => "DuplicateStringInspector",
            InspectionKind::SelfReferences => "SelfReferencingObjectsInspector",
        }
    }

    /// Line printed when nothing reaches the threshold
    pub fn fallback_line(self) -> &'static str {
        match self {
            InspectionKind::DuplicateStrings => "No significant amounts of duplicates found",
            InspectionKind::SelfReferences => {
                "No significant amounts of self referencing objects found"
            }
        }
    }

    /// Render one finding, without the trailing separator
    pub fn finding_line(self, finding: &Finding) -> String {
        match self {
            InspectionKind::DuplicateStrings => {
                format!("\"{}\" : {} times", finding.key, finding.count)
            }
            InspectionKind::SelfReferences => {
                format!(
                    "\"{}\" class has {} self references",
                    finding.key, finding.count
                )
            }
        }
    }
}

/// Header block for an inspector: separator, `<name> inspection`, separator
pub fn inspection_header(inspector_name: &str) -> String {
    format!("{LINE_SEPARATOR}{inspector_name} inspection{LINE_SEPARATOR}")
}

/// One key that reached the threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Decoded string content or class name
    pub key: String,
    pub count: u64,
}

/// Result of one inspection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub inspection: InspectionKind,
    pub threshold: u64,
    /// Findings in first-seen order
    pub findings: Vec<Finding>,
}

impl InspectionReport {
    pub fn new(inspection: InspectionKind, threshold: u64, findings: Vec<Finding>) -> Self {
        Self {
            inspection,
            threshold,
            findings,
        }
    }

    /// Render the report into `out` in the requested format
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W, format: ReportFormat) -> std::io::Result<()> {
        match format {
            ReportFormat::Text => self.write_text(out),
            ReportFormat::Json => self.write_json(out),
        }
    }

    fn write_text<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(inspection_header(self.inspection.inspector_name()).as_bytes())?;
        if self.findings.is_empty() {
            write!(out, "{}{}", self.inspection.fallback_line(), LINE_SEPARATOR)?;
            return Ok(());
        }
        for finding in &self.findings {
            write!(
                out,
                "{}{}",
                self.inspection.finding_line(finding),
                LINE_SEPARATOR
            )?;
        }
        Ok(())
    }

    fn write_json<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        serde_json::to_writer(&mut *out, self)?;
        out.write_all(LINE_SEPARATOR.as_bytes())
    }

    /// Render the report to a string
    pub fn render(&self, format: ReportFormat) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buf, format);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
