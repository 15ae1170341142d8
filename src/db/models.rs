use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Starting year of an NBA season (2022 = the 2022-23 season).
pub type Season = i32;

/// NBA conference membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conference {
    East,
    West,
}

impl FromStr for Conference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "east" | "eastern" => Ok(Conference::East),
            "west" | "western" => Ok(Conference::West),
            other => Err(format!("unknown conference '{}'", other)),
        }
    }
}

/// One team's championship estimate for one season, as produced by the
/// inference step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPrediction {
    pub team_name: String,
    pub team_abbr: String,
    /// Regular-season wins (0–82)
    pub wins: f64,
    /// Regular-season win percentage (0.0–1.0)
    pub win_pct: f64,
    pub points_per_game: f64,
    /// Average scoring margin per game
    pub point_diff: f64,
    /// Ensemble championship probability (0.0–1.0)
    pub championship_probability: f64,
    /// Per-model probabilities, keyed by model name (e.g. "XGBoost")
    #[serde(default)]
    pub model_probabilities: BTreeMap<String, f64>,
    #[serde(default)]
    pub conference: Option<Conference>,
}

/// Ground truth for a season as recorded upstream.
///
/// Every field except `season` may be missing: a season still in progress
/// has no champion, and older upstream payloads omit the derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualOutcome {
    pub season: Season,
    #[serde(default)]
    pub actual_champion: Option<String>,
    #[serde(default)]
    pub predicted_champion: Option<String>,
    #[serde(default)]
    pub correct: Option<bool>,
    #[serde(default, alias = "actual_rank")]
    pub actual_champion_rank: Option<usize>,
    #[serde(default, alias = "actual_probability")]
    pub actual_champion_probability: Option<f64>,
}

impl ActualOutcome {
    /// Ground truth carrying only the champion's name.
    pub fn champion(season: Season, actual_champion: Option<String>) -> Self {
        ActualOutcome {
            season,
            actual_champion,
            predicted_champion: None,
            correct: None,
            actual_champion_rank: None,
            actual_champion_probability: None,
        }
    }
}

/// Per-season evaluation of the model against ground truth. Derived on
/// demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub season: Season,
    pub actual_champion: Option<String>,
    /// Name of the rank-1 team
    pub predicted_champion: String,
    /// Championship probability of the rank-1 team
    pub predicted_probability: f64,
    pub correct: Option<bool>,
    /// 1-based rank of the actual champion; N+1 when it was not ranked
    pub actual_champion_rank: Option<usize>,
    pub actual_champion_probability: Option<f64>,
}

/// Known seasons, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonCatalog {
    pub seasons: Vec<Season>,
    pub latest: Option<Season>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}
