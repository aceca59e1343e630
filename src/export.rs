use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use tracing::{debug, info};

use crate::record::ReviewRecord;

/// Output file format, selected by the output path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    /// Detect format from file extension. Unrecognized extensions are a
    /// configuration error, surfaced before any work starts.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("json") => Some(Self::Json),
            Some("csv") => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Write records to the given path, dispatching on extension.
pub fn write_records(records: &[ReviewRecord], path: &Path) -> Result<OutputFormat> {
    let format = OutputFormat::from_path(path)
        .with_context(|| format!("Unsupported output format (use .json or .csv): {}", path.display()))?;

    match format {
        OutputFormat::Json => export_json(records, path)?,
        OutputFormat::Csv => export_csv(records, path)?,
    }
    Ok(format)
}

/// The partial-output path for an interrupted run: a run-timestamped file
/// next to the configured output, same extension. The distinct name
/// guarantees a later full-output write can never clobber it.
pub fn partial_output_path(output: &Path, at: DateTime<Utc>) -> PathBuf {
    let extension = OutputFormat::from_path(output)
        .map(|f| f.extension())
        .unwrap_or("json");
    let filename = format!("partial_reviews_{}.{}", at.format("%Y%m%d_%H%M%S"), extension);
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(filename),
        _ => PathBuf::from(filename),
    }
}

fn export_json(records: &[ReviewRecord], path: &Path) -> Result<()> {
    debug!("Exporting {} records to JSON: {}", records.len(), path.display());

    // serde_json leaves non-ASCII text as-is, which the downstream loader
    // depends on.
    let json = serde_json::to_string_pretty(records)?;

    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    file.write_all(json.as_bytes())?;

    info!("Successfully exported {} records to JSON: {}", records.len(), path.display());
    Ok(())
}

fn export_csv(records: &[ReviewRecord], path: &Path) -> Result<()> {
    debug!("Exporting {} records to CSV: {}", records.len(), path.display());

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record([
        "entity_name",
        "organization",
        "location",
        "address",
        "reviewer",
        "text",
        "rating",
        "date",
        "language",
        "source_url",
    ])?;

    for record in records {
        let rating = record.rating.map(|r| r.to_string()).unwrap_or_default();
        wtr.write_record([
            record.entity_name.as_str(),
            record.organization.as_str(),
            record.location.as_str(),
            record.address.as_str(),
            record.reviewer.as_str(),
            record.text.as_str(),
            rating.as_str(),
            record.date.as_str(),
            record.language.as_str(),
            record.source_url.as_str(),
        ])?;
    }

    wtr.flush()?;
    info!("Successfully exported {} records to CSV: {}", records.len(), path.display());
    Ok(())
}

/// Print the end-of-run summary to stdout.
pub fn print_run_summary(records: &[ReviewRecord]) {
    if records.is_empty() {
        println!("No reviews were collected.");
        return;
    }

    let unique_entities: HashSet<_> = records
        .iter()
        .map(|r| (r.entity_name.as_str(), r.source_url.as_str()))
        .collect();

    let mut per_target: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut per_language: BTreeMap<String, usize> = BTreeMap::new();
    let mut rated = 0usize;
    for record in records {
        *per_target
            .entry((record.organization.clone(), record.location.clone()))
            .or_insert(0) += 1;
        *per_language.entry(record.language.clone()).or_insert(0) += 1;
        if record.rating.is_some() {
            rated += 1;
        }
    }

    println!("\n=== Collection Summary ===");
    println!("Total reviews collected: {}", records.len());
    println!("Entities covered: {}", unique_entities.len());
    println!("Reviews carrying a rating: {}", rated);

    println!("By target:");
    for ((organization, location), count) in &per_target {
        println!("  {} / {}: {} reviews", organization, location, count);
    }

    println!("By language:");
    for (language, count) in &per_language {
        println!("  {}: {}", language, count);
    }
    println!("==========================\n");
}
