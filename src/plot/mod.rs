//! Chart rendering: distribution plots from the cleaned table and bar
//! charts from persisted summaries, all written as PNG.

pub mod canvas;
pub mod charts;

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::{info, warn};

use crate::data::model::Table;
use crate::report::{read_summary_csv, summary_file_name};

/// Box/strip and density plots for each metric, saved under `plots_dir`.
pub fn visualize_group_data<S: AsRef<str>>(
    table: &Table,
    metrics: &[S],
    group_column: &str,
    plots_dir: &Path,
) -> Result<Vec<PathBuf>> {
    info!("Starting data visualization");
    let mut written = Vec::new();

    for metric in metrics {
        let metric = metric.as_ref();

        let boxplot = plots_dir.join(format!("{metric}_boxplot.png"));
        charts::box_and_strip_plot(table, metric, group_column, &boxplot)?;
        written.push(boxplot);

        let kde = plots_dir.join(format!("{metric}_kde.png"));
        charts::kde_plot(table, metric, group_column, &kde)?;
        written.push(kde);
    }

    Ok(written)
}

/// Bar chart per persisted summary found in `analysis_dir`. Metrics without
/// a summary file are skipped with a warning.
pub fn visualize_analysis_results<S: AsRef<str>>(
    analysis_dir: &Path,
    metrics: &[S],
) -> Result<Vec<PathBuf>> {
    info!("Visualizing analysis results");
    let mut written = Vec::new();

    for metric in metrics {
        let metric = metric.as_ref();
        let csv_file = analysis_dir.join(summary_file_name(metric));
        if !csv_file.exists() {
            warn!("No data found for {metric}");
            continue;
        }

        let rows = read_summary_csv(&csv_file)?;
        let chart = analysis_dir.join(format!("{metric}_analysis_comparison.png"));
        charts::summary_bar_chart(&rows, &chart)?;
        written.push(chart);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, Value};
    use crate::report::save_group_comparisons;

    fn cohort() -> Table {
        Table::new(vec![
            Column::new("Group", vec!["A".into(), "B".into(), "A".into(), "B".into()]),
            Column::new("ASF", vec![0.9.into(), 0.85.into(), 0.88.into(), Value::Float(0.86)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_visualize_group_data_two_charts_per_metric() {
        let dir = tempfile::tempdir().unwrap();
        let written = visualize_group_data(&cohort(), &["ASF"], "Group", dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join("ASF_boxplot.png").exists());
        assert!(dir.path().join("ASF_kde.png").exists());
    }

    #[test]
    fn test_visualize_analysis_results_skips_missing_summary() {
        let dir = tempfile::tempdir().unwrap();
        save_group_comparisons(&cohort(), &["ASF"], "Group", dir.path()).unwrap();

        let written = visualize_analysis_results(dir.path(), &["ASF", "eTIV"]).unwrap();

        assert_eq!(written, vec![dir.path().join("ASF_analysis_comparison.png")]);
    }
}
