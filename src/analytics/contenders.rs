use serde::{Deserialize, Serialize};

use super::normalizer::{RankedSeason, RankedTeam};
use crate::db::models::Conference;

/// Caller-selected subset of the league.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConferenceFilter {
    #[default]
    #[serde(alias = "all")]
    All,
    #[serde(alias = "east")]
    East,
    #[serde(alias = "west")]
    West,
}

impl ConferenceFilter {
    pub fn admits(&self, team: &RankedTeam) -> bool {
        match self {
            ConferenceFilter::All => true,
            ConferenceFilter::East => team.team.conference == Some(Conference::East),
            ConferenceFilter::West => team.team.conference == Some(Conference::West),
        }
    }
}

/// Contender lists for the selected conference. Every entry keeps its
/// league-wide rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContenderView {
    pub filter: ConferenceFilter,
    pub top_contenders: Vec<RankedTeam>,
    /// Teams whose probability is above the contender threshold
    pub contenders: Vec<RankedTeam>,
    pub outsiders: Vec<RankedTeam>,
}

pub fn split_contenders(
    ranked: &RankedSeason,
    filter: ConferenceFilter,
    top_n: usize,
    threshold: f64,
) -> ContenderView {
    let filtered: Vec<RankedTeam> = ranked
        .teams()
        .iter()
        .filter(|t| filter.admits(t))
        .cloned()
        .collect();

    let top_contenders = filtered.iter().take(top_n).cloned().collect();
    let (contenders, outsiders) = filtered
        .into_iter()
        .partition(|t| t.team.championship_probability > threshold);

    ContenderView {
        filter,
        top_contenders,
        contenders,
        outsiders,
    }
}
