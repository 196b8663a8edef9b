//! CLI argument parsing for heaplens

use crate::report::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "heaplens")]
#[command(version)]
#[command(about = "Inspect heap snapshots for duplicate strings and self-referencing objects", long_about = None)]
pub struct Cli {
    /// Heap snapshot to inspect (JSON snapshot document)
    #[arg(value_name = "DUMP")]
    pub dump: Option<PathBuf>,

    /// Report string content duplicated across many instances (default when no inspection is selected)
    #[arg(short = 'd', long = "duplicate-strings")]
    pub duplicate_strings: bool,

    /// Report classes whose instances reference themselves
    #[arg(short = 's', long = "self-references")]
    pub self_references: bool,

    /// Run every inspection
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Minimum number of duplicates for a string to be reported (default: 100)
    #[arg(
        long = "duplicates-threshold",
        value_name = "COUNT",
        allow_negative_numbers = true
    )]
    pub duplicates_threshold: Option<i64>,

    /// Minimum number of self references for a class to be reported (default: 1)
    #[arg(
        long = "self-references-threshold",
        value_name = "COUNT",
        allow_negative_numbers = true
    )]
    pub self_references_threshold: Option<i64>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Load inspection thresholds from a TOML file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

/// Inspections selected on the command line, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub duplicate_strings: bool,
    pub self_references: bool,
}

impl Cli {
    /// Resolve inspection flags; duplicate strings run when nothing is selected
    pub fn selection(&self) -> Selection {
        if self.all {
            return Selection {
                duplicate_strings: true,
                self_references: true,
            };
        }
        if !self.duplicate_strings && !self.self_references {
            return Selection {
                duplicate_strings: true,
                self_references: false,
            };
        }
        Selection {
            duplicate_strings: self.duplicate_strings,
            self_references: self.self_references,
        }
    }
}
