//! Flat `(team, metric, value)` series for multi-team comparison charts.
//!
//! Scaling constants come from [`ComparisonScales`], fixed once at startup,
//! so the same team profile maps to the same value in every season.

use serde::Serialize;

use super::normalizer::RankedTeam;
use crate::db::models::TeamPrediction;

/// Label of the ensemble probability in the model breakdown.
pub const ENSEMBLE_LABEL: &str = "Ensemble";

/// Reference constants used to bring raw stats into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonScales {
    /// Points per game mapped to 1.0
    pub ppg_reference: f64,
    /// Added to point differential before dividing by `point_diff_range`
    pub point_diff_offset: f64,
    pub point_diff_range: f64,
}

impl Default for ComparisonScales {
    fn default() -> Self {
        ComparisonScales {
            ppg_reference: 120.0,
            point_diff_offset: 10.0,
            point_diff_range: 20.0,
        }
    }
}

/// Which value of a team a metric reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Extractor {
    WinPct,
    PointsPerGame,
    PointDiff,
    ChampionshipProbability,
    /// A single model's probability; 0 when the team has none recorded
    Model(String),
}

impl Extractor {
    pub fn extract(&self, team: &TeamPrediction) -> f64 {
        match self {
            Extractor::WinPct => team.win_pct,
            Extractor::PointsPerGame => team.points_per_game,
            Extractor::PointDiff => team.point_diff,
            Extractor::ChampionshipProbability => team.championship_probability,
            Extractor::Model(name) => team.model_probabilities.get(name).copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Already in `[0, 1]`
    Identity,
    /// `value / reference`
    Scale { reference: f64 },
    /// `(value + offset) / range`, optionally floored at 0
    Rescale { offset: f64, range: f64, floor_at_zero: bool },
}

impl Normalization {
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Normalization::Identity => value,
            Normalization::Scale { reference } => value / reference,
            Normalization::Rescale {
                offset,
                range,
                floor_at_zero,
            } => {
                let v = (value + offset) / range;
                if floor_at_zero {
                    v.max(0.0)
                } else {
                    v
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub extractor: Extractor,
    pub normalization: Normalization,
}

impl Metric {
    pub fn new(name: impl Into<String>, extractor: Extractor, normalization: Normalization) -> Self {
        Metric {
            name: name.into(),
            extractor,
            normalization,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub entity: String,
    pub metric: String,
    pub value: f64,
}

/// A fixed, ordered set of metrics applied to a top-N slice.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonBuilder {
    metrics: Vec<Metric>,
}

impl ComparisonBuilder {
    pub fn new(metrics: Vec<Metric>) -> Self {
        ComparisonBuilder { metrics }
    }

    /// Shape profile: win %, scoring, margin and title odds.
    pub fn profile(scales: &ComparisonScales) -> Self {
        ComparisonBuilder::new(vec![
            Metric::new("Win %", Extractor::WinPct, Normalization::Identity),
            Metric::new(
                "PPG (scaled)",
                Extractor::PointsPerGame,
                Normalization::Scale {
                    reference: scales.ppg_reference,
                },
            ),
            Metric::new(
                "Point Diff (scaled)",
                Extractor::PointDiff,
                Normalization::Rescale {
                    offset: scales.point_diff_offset,
                    range: scales.point_diff_range,
                    floor_at_zero: false,
                },
            ),
            Metric::new(
                "Championship Prob",
                Extractor::ChampionshipProbability,
                Normalization::Identity,
            ),
        ])
    }

    /// Grouped-bar stats: title odds, win % and a non-negative margin.
    pub fn stats(scales: &ComparisonScales) -> Self {
        ComparisonBuilder::new(vec![
            Metric::new(
                "Championship %",
                Extractor::ChampionshipProbability,
                Normalization::Identity,
            ),
            Metric::new("Win %", Extractor::WinPct, Normalization::Identity),
            Metric::new(
                "Point Diff (scaled)",
                Extractor::PointDiff,
                Normalization::Rescale {
                    offset: scales.point_diff_offset,
                    range: scales.point_diff_range,
                    floor_at_zero: true,
                },
            ),
        ])
    }

    /// Each ensemble member's probability followed by the ensemble itself.
    pub fn model_breakdown(models: &[String]) -> Self {
        let mut metrics: Vec<Metric> = models
            .iter()
            .map(|m| Metric::new(m.clone(), Extractor::Model(m.clone()), Normalization::Identity))
            .collect();
        metrics.push(Metric::new(
            ENSEMBLE_LABEL,
            Extractor::ChampionshipProbability,
            Normalization::Identity,
        ));
        ComparisonBuilder::new(metrics)
    }

    /// One point per (team, metric): teams in the given order, metrics in
    /// declaration order.
    pub fn build(&self, teams: &[RankedTeam]) -> Vec<ComparisonPoint> {
        teams
            .iter()
            .flat_map(|t| {
                self.metrics.iter().map(move |m| ComparisonPoint {
                    entity: t.team.team_abbr.clone(),
                    metric: m.name.clone(),
                    value: m.normalization.apply(m.extractor.extract(&t.team)),
                })
            })
            .collect()
    }
}
