pub mod api;
pub mod provider;

pub use api::ApiSource;
pub use provider::PredictionSource;

use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analytics::pipeline::FailureStage;
use crate::analytics::{
    build_historical_report, ConferenceFilter, HistoricalReport, Pipeline, SeasonFailure,
    SeasonInput, SeasonReport,
};
use crate::db::models::Season;

/// Fetch one season's rows and ground truth concurrently.
pub async fn fetch_season_input(source: &dyn PredictionSource, season: Season) -> Result<SeasonInput> {
    let (rows, outcome) = futures_util::future::try_join(
        source.fetch_predictions(season),
        source.fetch_outcome(season),
    )
    .await?;
    Ok(SeasonInput {
        season,
        rows,
        outcome,
    })
}

/// Fetch and evaluate one season, turning every failure into a report.
pub async fn evaluate_one(
    source: &dyn PredictionSource,
    pipeline: &Pipeline,
    season: Season,
    filter: ConferenceFilter,
) -> SeasonReport {
    let input = fetch_season_input(source, season)
        .await
        .map_err(|e| SeasonFailure {
            season,
            stage: FailureStage::Fetch,
            message: format!("{:#}", e),
        })?;
    pipeline
        .evaluate_season(input, filter)
        .map_err(SeasonFailure::from)
}

/// Evaluate many seasons with at most `max_concurrency` in flight.
///
/// Returns one report per requested season, ordered by season. A failing
/// season never affects the others.
pub async fn collect_season_bundles(
    source: Arc<dyn PredictionSource>,
    pipeline: Arc<Pipeline>,
    seasons: &[Season],
    max_concurrency: usize,
) -> Vec<SeasonReport> {
    let mut reports: Vec<(Season, SeasonReport)> = stream::iter(seasons.to_vec())
        .map(|season| {
            let source = Arc::clone(&source);
            let pipeline = Arc::clone(&pipeline);
            async move {
                let report =
                    evaluate_one(source.as_ref(), &pipeline, season, ConferenceFilter::All).await;
                if let Err(failure) = &report {
                    warn!(
                        "Season {} skipped ({:?}): {}",
                        season, failure.stage, failure.message
                    );
                }
                (season, report)
            }
        })
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    reports.sort_by_key(|(season, _)| *season);
    reports.into_iter().map(|(_, report)| report).collect()
}

/// Evaluate every catalogued season and fold the results into accuracy.
pub async fn historical_report(
    source: Arc<dyn PredictionSource>,
    pipeline: Arc<Pipeline>,
    max_concurrency: usize,
) -> Result<HistoricalReport> {
    let catalog = source.fetch_catalog().await?;
    let seasons = catalog.ascending();
    info!(
        "Evaluating {} season(s) from {} (concurrency={})",
        seasons.len(),
        source.name(),
        max_concurrency
    );

    let reports = collect_season_bundles(source, pipeline, &seasons, max_concurrency).await;
    let report = build_historical_report(reports);
    info!(
        "Historical accuracy: exact {:.1}%, top-3 {:.1}% over {} season(s), {} failed",
        report.accuracy.exact_accuracy * 100.0,
        report.accuracy.top3_accuracy * 100.0,
        report.accuracy.total_count,
        report.failures.len()
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analytics::normalizer::tests::team;
    use crate::analytics::PipelineSettings;
    use crate::db::models::{ActualOutcome, FeatureImportance, SeasonCatalog, TeamPrediction};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory source that also records how many fetches overlap.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        pub rows: HashMap<Season, Vec<TeamPrediction>>,
        pub champions: HashMap<Season, Option<String>>,
        pub broken: Vec<Season>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl StaticSource {
        pub(crate) fn with_season(mut self, season: Season, champion: Option<&str>) -> Self {
            self.rows.insert(
                season,
                vec![team("A", 0.30, 60.0), team("B", 0.25, 55.0), team("C", 0.10, 45.0)],
            );
            self.champions.insert(season, champion.map(String::from));
            self
        }
    }

    #[async_trait]
    impl PredictionSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_catalog(&self) -> Result<SeasonCatalog> {
            Ok(SeasonCatalog::from_seasons(self.rows.keys().copied()))
        }

        async fn fetch_predictions(&self, season: Season) -> Result<Vec<TeamPrediction>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.broken.contains(&season) {
                anyhow::bail!("upstream unavailable for {}", season);
            }
            Ok(self.rows.get(&season).cloned().unwrap_or_default())
        }

        async fn fetch_outcome(&self, season: Season) -> Result<Option<ActualOutcome>> {
            Ok(self
                .champions
                .get(&season)
                .map(|c| ActualOutcome::champion(season, c.clone())))
        }

        async fn fetch_feature_importance(&self) -> Result<Vec<FeatureImportance>> {
            Ok(Vec::new())
        }
    }

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(PipelineSettings::default()))
    }

    #[tokio::test]
    async fn reports_come_back_in_season_order() {
        let source = StaticSource::default()
            .with_season(2012, Some("A Team"))
            .with_season(2010, Some("B Team"))
            .with_season(2011, None);
        let reports =
            collect_season_bundles(Arc::new(source), pipeline(), &[2012, 2010, 2011], 2).await;
        let seasons: Vec<Season> = reports
            .iter()
            .map(|r| r.as_ref().map(|b| b.season).unwrap())
            .collect();
        assert_eq!(seasons, vec![2010, 2011, 2012]);
    }

    #[tokio::test]
    async fn failures_are_isolated_per_season() {
        let mut source = StaticSource::default()
            .with_season(2001, Some("A Team"))
            .with_season(2002, Some("A Team"));
        source.broken.push(2002);
        source.rows.insert(2003, Vec::new());

        let reports =
            collect_season_bundles(Arc::new(source), pipeline(), &[2001, 2002, 2003], 3).await;
        assert!(reports[0].is_ok());
        let fetch = reports[1].as_ref().unwrap_err();
        assert_eq!(fetch.stage, FailureStage::Fetch);
        assert!(fetch.message.contains("upstream unavailable"));
        let empty = reports[2].as_ref().unwrap_err();
        assert_eq!(empty.stage, FailureStage::EmptyInput);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_bound() {
        let mut source = StaticSource::default();
        for season in 2000..2012 {
            source = source.with_season(season, Some("A Team"));
        }
        let source = Arc::new(source);
        let seasons: Vec<Season> = (2000..2012).collect();
        let reports = collect_season_bundles(source.clone(), pipeline(), &seasons, 3).await;
        assert_eq!(reports.len(), 12);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn historical_report_covers_catalog() {
        let mut source = StaticSource::default()
            .with_season(2015, Some("A Team"))
            .with_season(2016, Some("B Team"))
            .with_season(2017, Some("Z Team"))
            .with_season(2018, None);
        source.broken.push(2016);

        let report = historical_report(Arc::new(source), pipeline(), 4).await.unwrap();
        assert_eq!(report.accuracy.total_count, 2);
        assert_eq!(report.accuracy.correct_count, 1);
        assert_eq!(report.accuracy.series[1].actual_champion_rank, Some(4));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].season, 2016);
    }
}
