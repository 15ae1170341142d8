use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use super::provider::PredictionSource;
use crate::db::models::{
    ActualOutcome, Conference, FeatureImportance, Season, SeasonCatalog, TeamPrediction,
};

/// Upstream column suffix → model name used in `model_probabilities`.
const MODEL_COLUMNS: [(&str, &str); 3] = [
    ("xgboost", "XGBoost"),
    ("lightgbm", "LightGBM"),
    ("catboost", "CatBoost"),
];

/// Client for the championship-prediction backend API.
#[derive(Clone)]
pub struct ApiSource {
    http: Client,
    base_url: Url,
}

impl ApiSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API URL '{}'", base_url))?;
        // Keep any path prefix when joining endpoint paths onto the base.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(ApiSource { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path '{}'", path))
    }

    /// GET an endpoint; `Ok(None)` on 404.
    async fn get_json(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let url = self.endpoint(path)?;
        debug!("Fetching {}", url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Prediction API request to {} failed", url))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Prediction API error {} for {}: {}", status, url, body);
        }

        let raw = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))?;
        Ok(Some(raw))
    }

    async fn get_required(&self, path: &str) -> Result<serde_json::Value> {
        self.get_json(path)
            .await?
            .with_context(|| format!("Prediction API has no resource at '{}'", path))
    }
}

#[async_trait]
impl PredictionSource for ApiSource {
    fn name(&self) -> &str {
        "PredictionAPI"
    }

    async fn fetch_catalog(&self) -> Result<SeasonCatalog> {
        let raw = self.get_required("seasons").await?;
        parse_catalog(&raw)
    }

    async fn fetch_predictions(&self, season: Season) -> Result<Vec<TeamPrediction>> {
        let raw = self.get_required(&format!("predictions/{}", season)).await?;
        parse_predictions(raw)
    }

    async fn fetch_outcome(&self, season: Season) -> Result<Option<ActualOutcome>> {
        match self.get_json(&format!("actual-champion/{}", season)).await? {
            Some(raw) => parse_outcome(season, raw).map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        let raw = self.get_required("features").await?;
        serde_json::from_value(raw).context("Malformed feature importance list")
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CatalogWire {
    #[serde(default)]
    seasons: Vec<Season>,
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    team_name: String,
    team_abbr: String,
    wins: f64,
    win_pct: f64,
    #[serde(alias = "points_per_game")]
    ppg: f64,
    point_diff: f64,
    championship_probability: f64,
    #[serde(default)]
    conference: Option<String>,
    /// `<model>_probability` columns and anything else upstream adds
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl From<PredictionRow> for TeamPrediction {
    fn from(row: PredictionRow) -> Self {
        let model_probabilities = MODEL_COLUMNS
            .iter()
            .filter_map(|(column, model)| {
                row.extra
                    .get(&format!("{}_probability", column))
                    .and_then(|v| v.as_f64())
                    .map(|p| (model.to_string(), p))
            })
            .collect();
        let conference = row.conference.as_deref().and_then(|c| match c.parse::<Conference>() {
            Ok(conf) => Some(conf),
            Err(e) => {
                debug!("Ignoring conference for {}: {}", row.team_abbr, e);
                None
            }
        });
        TeamPrediction {
            team_name: row.team_name,
            team_abbr: row.team_abbr,
            wins: row.wins,
            win_pct: row.win_pct,
            points_per_game: row.ppg,
            point_diff: row.point_diff,
            championship_probability: row.championship_probability,
            model_probabilities,
            conference,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutcomeWire {
    #[serde(default)]
    season: Option<Season>,
    #[serde(default)]
    actual_champion: Option<String>,
    #[serde(default)]
    predicted_champion: Option<String>,
    #[serde(default)]
    correct: Option<bool>,
    #[serde(default, alias = "actual_champion_rank")]
    actual_rank: Option<usize>,
    #[serde(default, alias = "actual_champion_probability")]
    actual_probability: Option<f64>,
}

fn parse_catalog(raw: &serde_json::Value) -> Result<SeasonCatalog> {
    let wire = CatalogWire::deserialize(raw).context("Malformed season list")?;
    Ok(SeasonCatalog::from_seasons(wire.seasons))
}

fn parse_predictions(raw: serde_json::Value) -> Result<Vec<TeamPrediction>> {
    let rows: Vec<PredictionRow> =
        serde_json::from_value(raw).context("Malformed prediction rows")?;
    Ok(rows.into_iter().map(TeamPrediction::from).collect())
}

fn parse_outcome(season: Season, raw: serde_json::Value) -> Result<ActualOutcome> {
    let wire: OutcomeWire = serde_json::from_value(raw).context("Malformed champion record")?;
    if let Some(reported) = wire.season {
        if reported != season {
            anyhow::bail!(
                "Champion record for season {} returned season {}",
                season,
                reported
            );
        }
    }
    Ok(ActualOutcome {
        season,
        actual_champion: wire.actual_champion,
        predicted_champion: wire.predicted_champion,
        correct: wire.correct,
        actual_champion_rank: wire.actual_rank,
        actual_champion_probability: wire.actual_probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_catalog_newest_first() {
        let catalog = parse_catalog(&json!({"seasons": [2020, 2022, 2021], "latest": 2022})).unwrap();
        assert_eq!(catalog.seasons, vec![2022, 2021, 2020]);
        assert_eq!(catalog.latest, Some(2022));
    }

    #[test]
    fn parses_empty_catalog_with_null_latest() {
        let catalog = parse_catalog(&json!({"seasons": [], "latest": null})).unwrap();
        assert!(catalog.seasons.is_empty());
        assert_eq!(catalog.latest, None);
    }

    #[test]
    fn parses_prediction_rows_and_folds_model_columns() {
        let raw = json!([{
            "team_name": "Denver Nuggets",
            "team_abbr": "DEN",
            "wins": 53.0,
            "win_pct": 0.646,
            "ppg": 115.8,
            "point_diff": 3.3,
            "championship_probability": 0.31,
            "xgboost_probability": 0.28,
            "catboost_probability": 0.35,
            "conference": "West"
        }, {
            "team_name": "Boston Celtics",
            "team_abbr": "BOS",
            "wins": 57.0,
            "win_pct": 0.695,
            "ppg": 117.9,
            "point_diff": 6.5,
            "championship_probability": 0.27
        }]);
        let rows = parse_predictions(raw).unwrap();
        assert_eq!(rows.len(), 2);
        let den = &rows[0];
        assert_eq!(den.points_per_game, 115.8);
        assert_eq!(den.conference, Some(Conference::West));
        assert_eq!(den.model_probabilities.get("XGBoost"), Some(&0.28));
        assert_eq!(den.model_probabilities.get("CatBoost"), Some(&0.35));
        assert!(!den.model_probabilities.contains_key("LightGBM"));
        assert_eq!(rows[1].conference, None);
        assert!(rows[1].model_probabilities.is_empty());
    }

    #[test]
    fn unknown_conference_is_dropped() {
        let raw = json!([{
            "team_name": "Atlanta Hawks",
            "team_abbr": "ATL",
            "wins": 41.0,
            "win_pct": 0.5,
            "ppg": 118.4,
            "point_diff": 0.3,
            "championship_probability": 0.01,
            "conference": "Central"
        }]);
        assert_eq!(parse_predictions(raw).unwrap()[0].conference, None);
    }

    #[test]
    fn malformed_rows_are_an_error() {
        assert!(parse_predictions(json!([{"team_abbr": "X"}])).is_err());
    }

    #[test]
    fn parses_outcome_with_upstream_field_names() {
        let raw = json!({
            "season": 2015,
            "actual_champion": "Golden State Warriors",
            "predicted_champion": "Golden State Warriors",
            "correct": true,
            "actual_rank": 1,
            "actual_probability": 0.62
        });
        let outcome = parse_outcome(2015, raw).unwrap();
        assert_eq!(outcome.actual_champion.as_deref(), Some("Golden State Warriors"));
        assert_eq!(outcome.correct, Some(true));
        assert_eq!(outcome.actual_champion_rank, Some(1));
        assert_eq!(outcome.actual_champion_probability, Some(0.62));
    }

    #[test]
    fn parses_outcome_without_ground_truth() {
        let raw = json!({
            "season": 2023,
            "actual_champion": null,
            "predicted_champion": null,
            "correct": null,
            "actual_rank": null
        });
        let outcome = parse_outcome(2023, raw).unwrap();
        assert_eq!(outcome, ActualOutcome::champion(2023, None));
    }

    #[test]
    fn outcome_for_wrong_season_is_rejected() {
        let raw = json!({"season": 2014, "actual_champion": "San Antonio Spurs"});
        assert!(parse_outcome(2015, raw).is_err());
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let source = ApiSource::new("http://localhost:8000/v1").unwrap();
        assert_eq!(
            source.endpoint("predictions/2020").unwrap().as_str(),
            "http://localhost:8000/v1/predictions/2020"
        );
        let root = ApiSource::new("http://localhost:8000").unwrap();
        assert_eq!(root.endpoint("seasons").unwrap().as_str(), "http://localhost:8000/seasons");
    }
}
