//! CLI entry point: load a cohort dataset, clean it, summarise each metric
//! per group and render comparison charts.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cohort_stats::config::PipelineConfig;
use cohort_stats::pipeline::run;
use log::info;

#[derive(Parser)]
#[command(name = "cohort-stats")]
#[command(about = "Clean a brain-scan cohort dataset and compare groups", long_about = None)]
struct Cli {
    /// TOML file with pipeline settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset to load (.csv, .json or .parquet)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the cleaned dataset
    #[arg(long)]
    cleaned_output: Option<PathBuf>,

    /// Directory for per-metric group comparison CSVs
    #[arg(short, long)]
    analysis_dir: Option<PathBuf>,

    /// Directory for distribution charts
    #[arg(short, long)]
    plots_dir: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long, default_value_t = false)]
    no_plots: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line flags layered on top.
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(out) = self.cleaned_output {
            config.cleaned_output = out;
        }
        if let Some(dir) = self.analysis_dir {
            config.analysis_dir = dir;
        }
        if let Some(dir) = self.plots_dir {
            config.plots_dir = dir;
        }
        if self.no_plots {
            config.render_plots = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config()?;
    let report = run(&config)?;

    if report.skipped {
        info!("Data file is empty or not found, nothing to do");
    } else {
        info!(
            "Kept {} of {} rows; outputs in {} and {}",
            report.rows_kept,
            report.rows_loaded,
            config.analysis_dir.display(),
            config.plots_dir.display()
        );
    }
    Ok(())
}
