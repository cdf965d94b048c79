//! End-to-end run: load → clean → persist → aggregate → chart.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::clean::clean;
use crate::config::PipelineConfig;
use crate::data::loader::load_file;
use crate::plot::{visualize_analysis_results, visualize_group_data};
use crate::report::{save_group_comparisons, write_table_csv};

/// What a run did.
#[derive(Debug, Default, PartialEq)]
pub struct RunReport {
    pub rows_loaded: usize,
    pub rows_kept: usize,
    /// The input had no rows, so nothing past loading ran.
    pub skipped: bool,
    pub files_written: Vec<PathBuf>,
}

/// Run the whole pipeline as described by `config`.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;
    info!("Starting data analysis");

    for dir in [&config.analysis_dir, &config.plots_dir] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    if let Some(parent) = config.cleaned_output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    let raw = load_file(&config.input)?;
    let mut report = RunReport {
        rows_loaded: raw.num_rows(),
        ..Default::default()
    };
    if raw.is_empty() {
        warn!("Data file {} is empty", config.input.display());
        report.skipped = true;
        return Ok(report);
    }

    info!("Starting data cleaning process");
    let cleaned = clean(&raw, &config.required_columns)?;
    report.rows_kept = cleaned.num_rows();
    info!(
        "Data cleaning completed: kept {} of {} rows",
        report.rows_kept, report.rows_loaded
    );

    write_table_csv(&cleaned, &config.cleaned_output)?;
    report.files_written.push(config.cleaned_output.clone());

    info!("Starting detailed data analysis");
    let summaries = save_group_comparisons(
        &cleaned,
        &config.metrics,
        &config.group_column,
        &config.analysis_dir,
    )?;
    report.files_written.extend(summaries);

    if config.render_plots {
        report.files_written.extend(visualize_group_data(
            &cleaned,
            &config.metrics,
            &config.group_column,
            &config.plots_dir,
        )?);
        report
            .files_written
            .extend(visualize_analysis_results(&config.analysis_dir, &config.metrics)?);
    }

    info!(
        "Data analysis completed successfully, {} files written",
        report.files_written.len()
    );
    Ok(report)
}
