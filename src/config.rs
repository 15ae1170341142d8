use clap::{Parser, ValueEnum};

use crate::analytics::comparison::ComparisonScales;
use crate::analytics::PipelineSettings;

/// Where raw predictions are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Prediction backend HTTP API
    Api,
    /// Local SQLite snapshot
    Sqlite,
}

/// NBA championship prediction analytics service
#[derive(Parser, Debug, Clone)]
#[command(name = "title-odds", version, about)]
pub struct Config {
    /// Source of raw prediction rows
    #[arg(long, env = "PREDICTION_SOURCE", value_enum, default_value = "api")]
    pub source: SourceKind,

    /// Prediction backend base URL
    #[arg(long, env = "PREDICTION_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// SQLite snapshot path (used with --source sqlite)
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db")]
    pub database_path: String,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Maximum number of seasons fetched and evaluated at once
    #[arg(long, env = "MAX_CONCURRENCY", default_value = "4")]
    pub max_concurrency: usize,

    /// Teams included in the comparison charts
    #[arg(long, env = "TOP_N", default_value = "5")]
    pub top_n: usize,

    /// Length of the top-contenders list
    #[arg(long, env = "TOP_CONTENDERS", default_value = "10")]
    pub top_contenders: usize,

    /// Probability a team must exceed to be listed as a contender
    #[arg(long, env = "CONTENDER_THRESHOLD", default_value = "0.001")]
    pub contender_threshold: f64,

    /// Points per game mapped to 1.0 on the profile chart
    #[arg(long, env = "PPG_REFERENCE", default_value = "120.0")]
    pub ppg_reference: f64,

    /// Offset added to point differential before rescaling
    #[arg(long, env = "POINT_DIFF_OFFSET", default_value = "10.0")]
    pub point_diff_offset: f64,

    /// Point differential span mapped onto 0.0–1.0
    #[arg(long, env = "POINT_DIFF_RANGE", default_value = "20.0")]
    pub point_diff_range: f64,

    /// Ensemble members shown in the model breakdown (comma-separated)
    #[arg(
        long,
        env = "MODELS",
        value_delimiter = ',',
        default_value = "XGBoost,LightGBM,CatBoost"
    )]
    pub models: Vec<String>,

    /// Print the historical accuracy report as JSON and exit
    #[arg(long, env = "REPORT_ONLY", default_value = "false")]
    pub report_only: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be at least 1");
        }
        if self.top_n == 0 {
            anyhow::bail!("top_n must be at least 1");
        }
        if self.top_contenders == 0 {
            anyhow::bail!("top_contenders must be at least 1");
        }
        if !(0.0..1.0).contains(&self.contender_threshold) {
            anyhow::bail!("contender_threshold must be in [0.0, 1.0)");
        }
        if !self.ppg_reference.is_finite() || self.ppg_reference <= 0.0 {
            anyhow::bail!("ppg_reference must be positive");
        }
        if !self.point_diff_range.is_finite() || self.point_diff_range <= 0.0 {
            anyhow::bail!("point_diff_range must be positive");
        }
        if !self.point_diff_offset.is_finite() {
            anyhow::bail!("point_diff_offset must be finite");
        }
        if self.models.iter().any(|m| m.trim().is_empty()) {
            anyhow::bail!("models must not contain empty names");
        }
        if self.source == SourceKind::Api && self.api_url.trim().is_empty() {
            anyhow::bail!("PREDICTION_API_URL is required with --source api");
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            top_n: self.top_n,
            top_contenders: self.top_contenders,
            contender_threshold: self.contender_threshold,
            scales: ComparisonScales {
                ppg_reference: self.ppg_reference,
                point_diff_offset: self.point_diff_offset,
                point_diff_range: self.point_diff_range,
            },
            models: self.models.iter().map(|m| m.trim().to_string()).collect(),
        }
    }
}
