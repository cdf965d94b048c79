use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::clean::DEFAULT_REQUIRED_COLUMNS;
use crate::stats::DEFAULT_GROUP_COLUMN;

/// Where the pipeline reads from and writes to, and which columns matter.
///
/// Every field is optional in the TOML file; absent ones take the defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub cleaned_output: PathBuf,
    pub analysis_dir: PathBuf,
    pub plots_dir: PathBuf,
    pub required_columns: Vec<String>,
    pub metrics: Vec<String>,
    pub group_column: String,
    pub render_plots: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/dataset.csv"),
            cleaned_output: PathBuf::from("data/cleaned_dataset.csv"),
            analysis_dir: PathBuf::from("analysis"),
            plots_dir: PathBuf::from("plots"),
            required_columns: DEFAULT_REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            metrics: ["eTIV", "nWBV", "ASF"].iter().map(|c| c.to_string()).collect(),
            group_column: DEFAULT_GROUP_COLUMN.to_string(),
            render_plots: true,
        }
    }
}

impl PipelineConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Metrics and the group column must survive cleaning, so they have to
    /// be required columns.
    pub fn validate(&self) -> Result<()> {
        if self.required_columns.is_empty() {
            bail!("required_columns must not be empty");
        }
        if self.metrics.is_empty() {
            bail!("metrics must not be empty");
        }
        let required = |c: &String| self.required_columns.contains(c);
        if !required(&self.group_column) {
            bail!("group column '{}' is not a required column", self.group_column);
        }
        if let Some(m) = self.metrics.iter().find(|m| !required(m)) {
            bail!("metric '{m}' is not a required column");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dataset_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.input, PathBuf::from("data/dataset.csv"));
        assert_eq!(config.required_columns, vec!["Group", "eTIV", "nWBV", "ASF"]);
        assert_eq!(config.metrics, vec!["eTIV", "nWBV", "ASF"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            input = "scans/oasis.parquet"
            render_plots = false
            "#,
        )
        .unwrap();

        assert_eq!(config.input, PathBuf::from("scans/oasis.parquet"));
        assert!(!config.render_plots);
        assert_eq!(config.group_column, "Group");
    }

    #[test]
    fn test_metric_must_be_required() {
        let err = PipelineConfig::from_toml(r#"metrics = ["Age"]"#).unwrap_err();
        assert!(err.to_string().contains("Age"));
    }

    #[test]
    fn test_empty_required_rejected() {
        assert!(PipelineConfig::from_toml("required_columns = []").is_err());
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(PipelineConfig::from_toml("input = ").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/cohort.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
