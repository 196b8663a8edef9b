use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use heaplens::cli::{Cli, Selection};
use heaplens::config::InspectConfig;
use heaplens::error::InspectionError;
use heaplens::graph::HeapGraph;
use heaplens::inspection::{DuplicateStringsInspector, Inspection, SelfReferencesInspector};
use heaplens::report::ReportFormat;
use heaplens::snapshot::HeapSnapshot;
use std::io::{self, BufWriter};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Resolve thresholds: command-line flags override the config file
fn resolve_config(args: &Cli) -> Result<InspectConfig> {
    let mut config = match &args.config {
        Some(path) => InspectConfig::from_file(path)?,
        None => InspectConfig::default(),
    };

    if let Some(threshold) = args.duplicates_threshold {
        config.duplicate_strings.threshold = threshold;
    }
    if let Some(threshold) = args.self_references_threshold {
        config.self_references.threshold = threshold;
    }

    config
        .validate()
        .map_err(InspectionError::InvalidConfiguration)?;
    Ok(config)
}

/// Run the selected inspections one after another, each with its own stdout sink
fn run_inspections<G: HeapGraph + ?Sized>(
    heap: &G,
    selection: Selection,
    config: &InspectConfig,
    format: ReportFormat,
) -> Result<()> {
    if selection.duplicate_strings {
        DuplicateStringsInspector::builder()
            .heap(heap)
            .sink(BufWriter::new(io::stdout().lock()))
            .threshold(config.duplicate_strings.threshold)
            .format(format)
            .build()?
            .inspect()
            .context("Duplicate strings inspection failed")?;
    }

    if selection.self_references {
        SelfReferencesInspector::builder()
            .heap(heap)
            .sink(BufWriter::new(io::stdout().lock()))
            .threshold(config.self_references.threshold)
            .format(format)
            .build()?
            .inspect()
            .context("Self references inspection failed")?;
    }

    Ok(())
}

fn main() -> Result<()> {
    // No arguments at all: show usage instead of failing
    if std::env::args_os().len() <= 1 {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let args = Cli::parse();

    init_tracing(args.debug);

    let config = resolve_config(&args)?;

    let Some(dump) = args.dump.as_deref() else {
        anyhow::bail!("Must specify a heap dump. Usage: heaplens [OPTIONS] <DUMP>");
    };

    let heap = HeapSnapshot::load(dump)?;

    run_inspections(&heap, args.selection(), &config, args.format)?;

    Ok(())
}
