//! Persistence of cleaned tables and per-metric group summaries.
//!
//! Summaries are written as `<metric>_group_comparison.csv` with the header
//! `group,mean,min,max,median`, one row per group in key order.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::data::model::Table;
use crate::stats::{GroupSummary, aggregate_all};

/// One persisted summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub group: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Flatten a [`GroupSummary`] into rows, keys rendered as text.
pub fn summary_rows(summary: &GroupSummary) -> Vec<SummaryRow> {
    summary
        .iter()
        .map(|(group, s)| SummaryRow {
            group: group.to_string(),
            mean: s.mean,
            min: s.min,
            max: s.max,
            median: s.median,
        })
        .collect()
}

/// File name of the persisted summary for `metric`.
pub fn summary_file_name(metric: &str) -> String {
    format!("{metric}_group_comparison.csv")
}

/// Writes a table as CSV: header row, then one line per row. Missing cells
/// are left empty.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(table.column_names())?;
    for i in 0..table.num_rows() {
        if let Some(row) = table.row(i) {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
    }
    writer.flush()?;

    debug!("wrote {} rows to {}", table.num_rows(), path.display());
    Ok(())
}

/// Writes a group summary as CSV with a `group,mean,min,max,median` header.
pub fn write_summary_csv(summary: &GroupSummary, path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    for row in summary_rows(summary) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads back a summary written by [`write_summary_csv`].
pub fn read_summary_csv(path: &Path) -> Result<Vec<SummaryRow>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: SummaryRow = result.with_context(|| format!("parsing {}", path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Aggregate each metric and persist it under `save_dir`.
/// Returns the written paths in metric order. Nothing is written when any
/// metric fails to aggregate.
pub fn save_group_comparisons<S: AsRef<str>>(
    table: &Table,
    metrics: &[S],
    group_column: &str,
    save_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut summaries = aggregate_all(table, metrics, group_column).with_context(|| {
        let names: Vec<&str> = metrics.iter().map(|m| m.as_ref()).collect();
        format!("comparing groups for {}", names.join(", "))
    })?;

    let mut written = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let metric = metric.as_ref();
        let Some(summary) = summaries.remove(metric) else {
            continue;
        };
        info!("Saving comparison data for {metric}");

        let path = save_dir.join(summary_file_name(metric));
        write_summary_csv(&summary, &path)?;

        debug!("summary for {metric}: {}", serde_json::to_string(&summary_rows(&summary))?);
        written.push(path);
    }

    Ok(written)
}
