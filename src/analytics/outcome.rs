//! Matches a season ranking against the recorded champion.
//!
//! An unmatched champion is ranked N+1 with probability 0. A champion is
//! never assumed to be among the ranked teams.

use serde::Serialize;

use super::normalizer::RankedSeason;
use crate::db::models::{ActualOutcome, HistoricalRecord};

/// Build the season's historical record from its ranking and ground truth.
pub fn match_outcome(ranked: &RankedSeason, actual: Option<&ActualOutcome>) -> HistoricalRecord {
    let leader = ranked.leader();
    let predicted_champion = leader.team.team_name.clone();
    let predicted_probability = leader.team.championship_probability;

    let champion = match actual.and_then(|a| a.actual_champion.as_deref()) {
        Some(name) => name,
        None => {
            return HistoricalRecord {
                season: ranked.season(),
                actual_champion: None,
                predicted_champion,
                predicted_probability,
                correct: None,
                actual_champion_rank: None,
                actual_champion_probability: None,
            }
        }
    };

    let (rank, probability) = match ranked.find_by_name(champion) {
        Some(found) => (found.rank, found.team.championship_probability),
        None => (ranked.len() + 1, 0.0),
    };

    HistoricalRecord {
        season: ranked.season(),
        actual_champion: Some(champion.to_string()),
        correct: Some(predicted_champion == champion),
        predicted_champion,
        predicted_probability,
        actual_champion_rank: Some(rank),
        actual_champion_probability: Some(probability),
    }
}

/// Disagreement between what upstream reported for a season and what the
/// ranking says.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    PredictedChampionMismatch { reported: String, computed: String },
    CorrectnessMismatch { reported: bool, computed: Option<bool> },
    RankMismatch { reported: usize, computed: Option<usize> },
    ProbabilityMismatch { reported: f64, computed: Option<f64> },
}

/// Largest difference between reported and recomputed probabilities still
/// treated as agreement.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Compare the upstream-reported derived fields with the recomputed record.
/// Fields upstream left empty are not checked.
pub fn check_integrity(reported: &ActualOutcome, computed: &HistoricalRecord) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    if let Some(name) = &reported.predicted_champion {
        if *name != computed.predicted_champion {
            issues.push(IntegrityIssue::PredictedChampionMismatch {
                reported: name.clone(),
                computed: computed.predicted_champion.clone(),
            });
        }
    }
    if let Some(correct) = reported.correct {
        if Some(correct) != computed.correct {
            issues.push(IntegrityIssue::CorrectnessMismatch {
                reported: correct,
                computed: computed.correct,
            });
        }
    }
    if let Some(rank) = reported.actual_champion_rank {
        if Some(rank) != computed.actual_champion_rank {
            issues.push(IntegrityIssue::RankMismatch {
                reported: rank,
                computed: computed.actual_champion_rank,
            });
        }
    }
    if let Some(probability) = reported.actual_champion_probability {
        let agrees = computed
            .actual_champion_probability
            .is_some_and(|p| (p - probability).abs() <= PROBABILITY_TOLERANCE);
        if !agrees {
            issues.push(IntegrityIssue::ProbabilityMismatch {
                reported: probability,
                computed: computed.actual_champion_probability,
            });
        }
    }

    issues
}
