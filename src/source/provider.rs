use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::{ActualOutcome, FeatureImportance, Season, SeasonCatalog, TeamPrediction};

/// Trait that every source of raw prediction data must implement.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// Seasons with stored predictions.
    async fn fetch_catalog(&self) -> Result<SeasonCatalog>;

    /// Raw per-team rows for one season, in whatever order the source keeps them.
    async fn fetch_predictions(&self, season: Season) -> Result<Vec<TeamPrediction>>;

    /// Recorded ground truth, or `None` when the source knows nothing about the season.
    async fn fetch_outcome(&self, season: Season) -> Result<Option<ActualOutcome>>;

    async fn fetch_feature_importance(&self) -> Result<Vec<FeatureImportance>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
