use thiserror::Error;

use crate::db::models::Season;

/// Reasons a season's raw rows cannot be turned into a ranking.
///
/// Missing ground truth, an unranked champion or an empty conference are
/// not errors: they degrade to `None` / `0` in the derived values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("season {season}: team {team} has {field} = {value}, expected {min}..={max}")]
    Validation {
        season: Season,
        team: String,
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("season {season} has no team predictions")]
    EmptyInput { season: Season },
}

impl AnalyticsError {
    pub fn season(&self) -> Season {
        match self {
            AnalyticsError::Validation { season, .. } | AnalyticsError::EmptyInput { season } => {
                *season
            }
        }
    }
}
