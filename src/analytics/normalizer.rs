//! Turns a season's raw prediction rows into its canonical ranking.
//!
//! Order: championship probability descending, then wins descending, then
//! team abbreviation ascending. After deduplication by abbreviation this is
//! a total order, so the same rows always produce the same ranking.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::error::AnalyticsError;
use crate::db::models::{Season, TeamPrediction};

/// Most regular-season games a team can win.
pub const MAX_WINS: f64 = 82.0;

/// A team together with its 1-based position in the season ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTeam {
    pub rank: usize,
    #[serde(flatten)]
    pub team: TeamPrediction,
}

/// A season's predictions in ranking order. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSeason {
    season: Season,
    teams: Vec<RankedTeam>,
}

impl RankedSeason {
    pub fn season(&self) -> Season {
        self.season
    }

    pub fn teams(&self) -> &[RankedTeam] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// The rank-1 team.
    pub fn leader(&self) -> &RankedTeam {
        // Construction rejects empty input, so index 0 always exists.
        &self.teams[0]
    }

    /// The first `n` teams (fewer if the season is smaller).
    pub fn top(&self, n: usize) -> &[RankedTeam] {
        &self.teams[..n.min(self.teams.len())]
    }

    /// Locate a team by its full name.
    pub fn find_by_name(&self, team_name: &str) -> Option<&RankedTeam> {
        self.teams.iter().find(|t| t.team.team_name == team_name)
    }

    /// Plain rows in ranking order.
    #[cfg(test)]
    pub fn predictions(&self) -> Vec<TeamPrediction> {
        self.teams.iter().map(|t| t.team.clone()).collect()
    }
}

/// Validate, deduplicate and rank one season's rows.
///
/// Every input row is validated, including rows later replaced by a
/// duplicate. For duplicate `team_abbr` keys the last occurrence wins.
pub fn normalize_season(
    season: Season,
    rows: Vec<TeamPrediction>,
) -> Result<RankedSeason, AnalyticsError> {
    if rows.is_empty() {
        return Err(AnalyticsError::EmptyInput { season });
    }
    for row in &rows {
        validate_row(season, row)?;
    }

    let mut by_abbr: HashMap<String, TeamPrediction> = HashMap::with_capacity(rows.len());
    for row in rows {
        by_abbr.insert(row.team_abbr.clone(), row);
    }

    let mut teams: Vec<TeamPrediction> = by_abbr.into_values().collect();
    teams.sort_by(ranking_order);

    let teams = teams
        .into_iter()
        .enumerate()
        .map(|(i, team)| RankedTeam { rank: i + 1, team })
        .collect();

    Ok(RankedSeason { season, teams })
}

fn validate_row(season: Season, row: &TeamPrediction) -> Result<(), AnalyticsError> {
    check_range(season, row, "championship_probability", row.championship_probability, 0.0, 1.0)?;
    check_range(season, row, "wins", row.wins, 0.0, MAX_WINS)
}

fn check_range(
    season: Season,
    row: &TeamPrediction,
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), AnalyticsError> {
    // NaN fails `contains`, so it is rejected here as well.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AnalyticsError::Validation {
            season,
            team: row.team_abbr.clone(),
            field,
            value,
            min,
            max,
        })
    }
}

/// Rows are validated first, so NaN never reaches the comparisons and
/// `-0.0` ties with `0.0`.
fn ranking_order(a: &TeamPrediction, b: &TeamPrediction) -> Ordering {
    descending(a.championship_probability, b.championship_probability)
        .then_with(|| descending(a.wins, b.wins))
        .then_with(|| a.team_abbr.cmp(&b.team_abbr))
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) fn team(abbr: &str, prob: f64, wins: f64) -> TeamPrediction {
        TeamPrediction {
            team_name: format!("{} Team", abbr),
            team_abbr: abbr.into(),
            wins,
            win_pct: wins / MAX_WINS,
            points_per_game: 112.0,
            point_diff: 0.0,
            championship_probability: prob,
            model_probabilities: BTreeMap::new(),
            conference: None,
        }
    }

    #[test]
    fn ranks_by_probability_descending() {
        let ranked = normalize_season(
            2020,
            vec![team("C", 0.10, 40.0), team("A", 0.30, 50.0), team("B", 0.25, 55.0)],
        )
        .unwrap();
        let abbrs: Vec<&str> = ranked.teams().iter().map(|t| t.team.team_abbr.as_str()).collect();
        assert_eq!(abbrs, vec!["A", "B", "C"]);
        let ranks: Vec<usize> = ranked.teams().iter().map(|t| t.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(ranked.leader().team.team_abbr, "A");
    }

    #[test]
    fn ties_break_on_wins_then_abbreviation() {
        let ranked = normalize_season(
            2020,
            vec![
                team("ZZZ", 0.2, 50.0),
                team("AAA", 0.2, 50.0),
                team("MMM", 0.2, 60.0),
            ],
        )
        .unwrap();
        let abbrs: Vec<&str> = ranked.teams().iter().map(|t| t.team.team_abbr.as_str()).collect();
        assert_eq!(abbrs, vec!["MMM", "AAA", "ZZZ"]);
    }

    #[test]
    fn negative_zero_ties_with_zero() {
        let ranked = normalize_season(
            2020,
            vec![
                team("AAA", 0.0, 10.0),
                team("BBB", -0.0, 50.0),
                team("CCC", 0.0, 50.0),
                team("DDD", 0.0, -0.0),
                team("EEE", 0.0, 0.0),
            ],
        )
        .unwrap();
        let abbrs: Vec<&str> = ranked.teams().iter().map(|t| t.team.team_abbr.as_str()).collect();
        assert_eq!(abbrs, vec!["BBB", "CCC", "AAA", "DDD", "EEE"]);
    }

    #[test]
    fn duplicate_abbreviation_keeps_last_occurrence() {
        let ranked = normalize_season(
            2021,
            vec![team("BOS", 0.50, 57.0), team("MIL", 0.20, 51.0), team("BOS", 0.05, 57.0)],
        )
        .unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked.leader().team.team_abbr, "MIL");
        let bos = ranked.teams().iter().find(|t| t.team.team_abbr == "BOS").unwrap();
        assert_eq!(bos.team.championship_probability, 0.05);
        assert_eq!(bos.rank, 2);
    }

    #[test]
    fn ranks_are_contiguous_and_probability_non_increasing() {
        let rows: Vec<TeamPrediction> = (0..30)
            .map(|i| team(&format!("T{:02}", i), ((i * 7) % 11) as f64 / 20.0, (i % 5) as f64 * 10.0))
            .collect();
        let ranked = normalize_season(2015, rows).unwrap();
        assert_eq!(ranked.len(), 30);
        for (i, t) in ranked.teams().iter().enumerate() {
            assert_eq!(t.rank, i + 1);
        }
        for pair in ranked.teams().windows(2) {
            assert!(pair[0].team.championship_probability >= pair[1].team.championship_probability);
        }
    }

    #[test]
    fn renormalizing_sorted_input_is_idempotent() {
        let first = normalize_season(
            2018,
            vec![team("GSW", 0.6, 58.0), team("HOU", 0.6, 65.0), team("TOR", 0.3, 59.0)],
        )
        .unwrap();
        let second = normalize_season(2018, first.predictions()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = normalize_season(2010, Vec::new()).unwrap_err();
        assert_eq!(err, AnalyticsError::EmptyInput { season: 2010 });
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let err = normalize_season(2010, vec![team("LAL", 1.2, 57.0)]).unwrap_err();
        match err {
            AnalyticsError::Validation { field, team, .. } => {
                assert_eq!(field, "championship_probability");
                assert_eq!(team, "LAL");
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn nan_probability_is_rejected() {
        assert!(normalize_season(2010, vec![team("LAL", f64::NAN, 57.0)]).is_err());
    }

    #[test]
    fn out_of_range_wins_is_rejected() {
        let err = normalize_season(2010, vec![team("LAL", 0.3, 83.0)]).unwrap_err();
        assert!(matches!(err, AnalyticsError::Validation { field: "wins", .. }));
        assert!(normalize_season(2010, vec![team("LAL", 0.3, -1.0)]).is_err());
    }

    #[test]
    fn invalid_row_replaced_by_duplicate_still_fails() {
        let err = normalize_season(2010, vec![team("LAL", 2.0, 57.0), team("LAL", 0.3, 57.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn top_clamps_to_season_size() {
        let ranked = normalize_season(2010, vec![team("A", 0.3, 50.0), team("B", 0.2, 40.0)]).unwrap();
        assert_eq!(ranked.top(5).len(), 2);
        assert_eq!(ranked.top(1).len(), 1);
    }
}
