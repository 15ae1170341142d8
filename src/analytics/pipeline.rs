//! Per-season pipeline and the multi-season historical fold.
//!
//! Within a season the steps run in a fixed order: normalize, then match
//! the outcome, aggregate conferences, build comparisons and split the
//! contenders from the same ranking.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::accuracy::{aggregate_accuracy, AccuracySummary};
use super::comparison::{ComparisonBuilder, ComparisonPoint, ComparisonScales};
use super::conference::{aggregate_conferences, ConferencePoint, ConferenceSummary};
use super::contenders::{split_contenders, ConferenceFilter, ContenderView};
use super::error::AnalyticsError;
use super::normalizer::{normalize_season, RankedSeason};
use super::outcome::{check_integrity, match_outcome, IntegrityIssue};
use crate::db::models::{ActualOutcome, HistoricalRecord, Season, TeamPrediction};

/// Tunables for a [`Pipeline`]; fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Teams included in the comparison series
    pub top_n: usize,
    /// Length of the top-contenders list
    pub top_contenders: usize,
    /// Probability a team must exceed to count as a contender
    pub contender_threshold: f64,
    pub scales: ComparisonScales,
    /// Ensemble members shown in the model breakdown
    pub models: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            top_n: 5,
            top_contenders: 10,
            contender_threshold: 0.001,
            scales: ComparisonScales::default(),
            models: vec!["XGBoost".into(), "LightGBM".into(), "CatBoost".into()],
        }
    }
}

/// Raw inputs for one season, already fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonInput {
    pub season: Season,
    pub rows: Vec<TeamPrediction>,
    pub outcome: Option<ActualOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSet {
    pub profile: Vec<ComparisonPoint>,
    pub stats: Vec<ComparisonPoint>,
    pub models: Vec<ComparisonPoint>,
}

/// Everything the display needs for one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonBundle {
    pub season: Season,
    pub ranked: RankedSeason,
    pub record: HistoricalRecord,
    pub conferences: ConferenceSummary,
    pub conference_points: Vec<ConferencePoint>,
    pub comparisons: ComparisonSet,
    pub contenders: ContenderView,
    pub integrity: Vec<IntegrityIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Validation,
    EmptyInput,
}

/// A season that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonFailure {
    pub season: Season,
    pub stage: FailureStage,
    pub message: String,
}

impl From<AnalyticsError> for SeasonFailure {
    fn from(err: AnalyticsError) -> Self {
        let stage = match err {
            AnalyticsError::Validation { .. } => FailureStage::Validation,
            AnalyticsError::EmptyInput { .. } => FailureStage::EmptyInput,
        };
        SeasonFailure {
            season: err.season(),
            stage,
            message: err.to_string(),
        }
    }
}

/// Outcome of evaluating one season.
pub type SeasonReport = Result<SeasonBundle, SeasonFailure>;

/// Accuracy across seasons plus the seasons that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalReport {
    pub generated_at: DateTime<Utc>,
    pub accuracy: AccuracySummary,
    pub failures: Vec<SeasonFailure>,
}

pub struct Pipeline {
    settings: PipelineSettings,
    profile: ComparisonBuilder,
    stats: ComparisonBuilder,
    models: ComparisonBuilder,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        let profile = ComparisonBuilder::profile(&settings.scales);
        let stats = ComparisonBuilder::stats(&settings.scales);
        let models = ComparisonBuilder::model_breakdown(&settings.models);
        Pipeline {
            settings,
            profile,
            stats,
            models,
        }
    }

    /// Run the full per-season pipeline.
    pub fn evaluate_season(
        &self,
        input: SeasonInput,
        filter: ConferenceFilter,
    ) -> Result<SeasonBundle, AnalyticsError> {
        let SeasonInput {
            season,
            rows,
            outcome,
        } = input;

        let ranked = normalize_season(season, rows)?;
        let record = match_outcome(&ranked, outcome.as_ref());

        let integrity = outcome
            .as_ref()
            .map(|reported| check_integrity(reported, &record))
            .unwrap_or_default();
        for issue in &integrity {
            warn!("Season {}: upstream outcome disagrees with ranking: {:?}", season, issue);
        }

        let conferences = aggregate_conferences(&ranked);
        if !conferences.has_signal() {
            debug!("Season {}: no conference data on any row", season);
        }
        let top = ranked.top(self.settings.top_n);
        let comparisons = ComparisonSet {
            profile: self.profile.build(top),
            stats: self.stats.build(top),
            models: self.models.build(top),
        };
        let contenders = split_contenders(
            &ranked,
            filter,
            self.settings.top_contenders,
            self.settings.contender_threshold,
        );

        debug!(
            "Season {}: {} teams ranked, leader {} ({:.1}%)",
            season,
            ranked.len(),
            record.predicted_champion,
            record.predicted_probability * 100.0
        );

        Ok(SeasonBundle {
            season,
            conference_points: conferences.points(),
            conferences,
            comparisons,
            contenders,
            integrity,
            record,
            ranked,
        })
    }
}

/// Fold per-season reports into the historical accuracy report.
/// Failed seasons are listed, never dropped.
pub fn build_historical_report(reports: Vec<SeasonReport>) -> HistoricalReport {
    let mut records = Vec::with_capacity(reports.len());
    let mut failures = Vec::new();
    for report in reports {
        match report {
            Ok(bundle) => records.push(bundle.record),
            Err(failure) => failures.push(failure),
        }
    }
    failures.sort_by_key(|f| f.season);

    HistoricalReport {
        generated_at: Utc::now(),
        accuracy: aggregate_accuracy(records),
        failures,
    }
}
