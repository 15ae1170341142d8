use serde::Serialize;

use super::normalizer::{RankedSeason, RankedTeam};
use crate::db::models::Conference;

/// Number of leading teams averaged per conference.
pub const AVG_TOP_N: usize = 5;

/// East/West strength of a season's field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConferenceSummary {
    pub east_top: f64,
    pub west_top: f64,
    pub east_avg_top5: f64,
    pub west_avg_top5: f64,
}

/// One `(conference, metric, value)` point for grouped display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConferencePoint {
    pub conference: Conference,
    pub metric: &'static str,
    pub value: f64,
}

impl ConferenceSummary {
    /// Flatten into display points. Non-finite values are dropped.
    pub fn points(&self) -> Vec<ConferencePoint> {
        [
            (Conference::East, "Top Team", self.east_top),
            (Conference::West, "Top Team", self.west_top),
            (Conference::East, "Avg Top 5", self.east_avg_top5),
            (Conference::West, "Avg Top 5", self.west_avg_top5),
        ]
        .into_iter()
        .filter(|(_, _, value)| value.is_finite())
        .map(|(conference, metric, value)| ConferencePoint {
            conference,
            metric,
            value,
        })
        .collect()
    }

    /// Whether any conference metric is positive.
    pub fn has_signal(&self) -> bool {
        self.points().iter().any(|p| p.value > 0.0)
    }
}

pub fn aggregate_conferences(ranked: &RankedSeason) -> ConferenceSummary {
    let east = members(ranked, Conference::East);
    let west = members(ranked, Conference::West);
    ConferenceSummary {
        east_top: top_probability(&east),
        west_top: top_probability(&west),
        east_avg_top5: avg_top_probability(&east, AVG_TOP_N),
        west_avg_top5: avg_top_probability(&west, AVG_TOP_N),
    }
}

/// Teams of one conference, in ranking order.
pub fn members(ranked: &RankedSeason, conference: Conference) -> Vec<&RankedTeam> {
    ranked
        .teams()
        .iter()
        .filter(|t| t.team.conference == Some(conference))
        .collect()
}

fn top_probability(teams: &[&RankedTeam]) -> f64 {
    teams
        .first()
        .map(|t| t.team.championship_probability)
        .unwrap_or(0.0)
}

fn avg_top_probability(teams: &[&RankedTeam], n: usize) -> f64 {
    let head = &teams[..n.min(teams.len())];
    if head.is_empty() {
        return 0.0;
    }
    let sum: f64 = head.iter().map(|t| t.team.championship_probability).sum();
    sum / head.len() as f64
}
