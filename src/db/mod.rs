use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub mod models;
use models::*;

use crate::source::PredictionSource;

/// Read-only snapshot of raw prediction rows kept in SQLite.
///
/// Holds inputs only (rows, champions, feature importance). Derived
/// records are recomputed on every read and never written back.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open snapshot database {}", path))?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("snapshot database mutex poisoned"))
    }

    // ── Seasons ──────────────────────────────────────────────────────────────

    pub fn list_seasons(&self) -> Result<Vec<Season>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT season FROM team_predictions")?;
        let seasons = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<Season>>>()?;
        Ok(seasons)
    }

    // ── Predictions ──────────────────────────────────────────────────────────

    /// Rows for one season in insertion order (duplicates included).
    pub fn list_predictions(&self, season: Season) -> Result<Vec<TeamPrediction>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT team_abbr, model, probability
             FROM model_probabilities WHERE season = ?1",
        )?;
        let mut by_team: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
        let rows = stmt.query_map(params![season], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;
        for row in rows {
            let (abbr, model, probability) = row?;
            by_team.entry(abbr).or_default().insert(model, probability);
        }

        let mut stmt = conn.prepare(
            "SELECT team_name, team_abbr, wins, win_pct, points_per_game,
                    point_diff, championship_probability, conference
             FROM team_predictions WHERE season = ?1 ORDER BY id",
        )?;
        let predictions = stmt
            .query_map(params![season], map_prediction)?
            .collect::<rusqlite::Result<Vec<_>>>()?
            .into_iter()
            .map(|mut p| {
                if let Some(models) = by_team.get(&p.team_abbr) {
                    p.model_probabilities = models.clone();
                }
                p
            })
            .collect();
        Ok(predictions)
    }

    // ── Ground truth ─────────────────────────────────────────────────────────

    pub fn get_outcome(&self, season: Season) -> Result<Option<ActualOutcome>> {
        let conn = self.lock()?;
        let champion: Option<Option<String>> = conn
            .query_row(
                "SELECT actual_champion FROM champions WHERE season = ?1",
                params![season],
                |row| row.get(0),
            )
            .optional()?;
        Ok(champion.map(|name| ActualOutcome::champion(season, name)))
    }

    // ── Features ─────────────────────────────────────────────────────────────

    pub fn list_feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT feature, importance FROM feature_importance ORDER BY importance DESC",
        )?;
        let features = stmt
            .query_map([], |row| {
                Ok(FeatureImportance {
                    feature: row.get(0)?,
                    importance: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(features)
    }
}

#[async_trait]
impl PredictionSource for Database {
    fn name(&self) -> &str {
        "SQLiteSnapshot"
    }

    async fn fetch_catalog(&self) -> Result<SeasonCatalog> {
        Ok(SeasonCatalog::from_seasons(self.list_seasons()?))
    }

    async fn fetch_predictions(&self, season: Season) -> Result<Vec<TeamPrediction>> {
        let rows = self.list_predictions(season)?;
        debug!("Loaded {} rows for season {} from snapshot", rows.len(), season);
        Ok(rows)
    }

    async fn fetch_outcome(&self, season: Season) -> Result<Option<ActualOutcome>> {
        self.get_outcome(season)
    }

    async fn fetch_feature_importance(&self) -> Result<Vec<FeatureImportance>> {
        self.list_feature_importance()
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn map_prediction(row: &rusqlite::Row) -> rusqlite::Result<TeamPrediction> {
    let conference: Option<String> = row.get(7)?;
    Ok(TeamPrediction {
        team_name: row.get(0)?,
        team_abbr: row.get(1)?,
        wins: row.get(2)?,
        win_pct: row.get(3)?,
        points_per_game: row.get(4)?,
        point_diff: row.get(5)?,
        championship_probability: row.get(6)?,
        model_probabilities: BTreeMap::new(),
        conference: conference.and_then(|c| c.parse().ok()),
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS team_predictions (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    season                   INTEGER NOT NULL,
    team_name                TEXT    NOT NULL,
    team_abbr                TEXT    NOT NULL,
    wins                     REAL    NOT NULL,
    win_pct                  REAL    NOT NULL,
    points_per_game          REAL    NOT NULL,
    point_diff               REAL    NOT NULL,
    championship_probability REAL    NOT NULL,
    conference               TEXT
);

CREATE TABLE IF NOT EXISTS model_probabilities (
    season      INTEGER NOT NULL,
    team_abbr   TEXT    NOT NULL,
    model       TEXT    NOT NULL,
    probability REAL    NOT NULL,
    PRIMARY KEY (season, team_abbr, model)
);

CREATE TABLE IF NOT EXISTS champions (
    season          INTEGER PRIMARY KEY,
    actual_champion TEXT
);

CREATE TABLE IF NOT EXISTS feature_importance (
    feature    TEXT PRIMARY KEY,
    importance REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_team_predictions_season ON team_predictions(season);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Database) {
        let conn = db.lock().unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO team_predictions (season, team_name, team_abbr, wins, win_pct,
                points_per_game, point_diff, championship_probability, conference)
            VALUES
                (2021, 'Milwaukee Bucks', 'MIL', 46, 0.639, 120.1, 5.9, 0.18, 'East'),
                (2021, 'Utah Jazz', 'UTA', 52, 0.722, 116.4, 9.3, 0.35, 'West'),
                (2021, 'Phoenix Suns', 'PHX', 51, 0.708, 115.3, 6.1, 0.22, NULL),
                (2022, 'Boston Celtics', 'BOS', 51, 0.622, 111.8, 7.3, 0.40, 'East');
            INSERT INTO model_probabilities (season, team_abbr, model, probability) VALUES
                (2021, 'MIL', 'XGBoost', 0.2),
                (2021, 'MIL', 'CatBoost', 0.15),
                (2022, 'MIL', 'XGBoost', 0.9);
            INSERT INTO champions (season, actual_champion) VALUES
                (2021, 'Milwaukee Bucks'),
                (2022, NULL);
            INSERT INTO feature_importance (feature, importance) VALUES
                ('win_pct', 0.12),
                ('point_diff', 0.31);
            "#,
        )
        .unwrap();
    }

    #[test]
    fn migrations_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().unwrap();
        assert!(db.list_seasons().unwrap().is_empty());
    }

    #[test]
    fn reads_rows_in_insertion_order_with_models() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        let rows = db.list_predictions(2021).unwrap();
        let abbrs: Vec<&str> = rows.iter().map(|r| r.team_abbr.as_str()).collect();
        assert_eq!(abbrs, vec!["MIL", "UTA", "PHX"]);
        assert_eq!(rows[0].conference, Some(Conference::East));
        assert_eq!(rows[2].conference, None);
        assert_eq!(rows[0].model_probabilities.len(), 2);
        assert_eq!(rows[0].model_probabilities.get("XGBoost"), Some(&0.2));
        assert!(rows[1].model_probabilities.is_empty());
        assert_eq!(rows[0].wins, 46.0);
    }

    #[test]
    fn outcome_distinguishes_unknown_and_unresolved_seasons() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        assert_eq!(
            db.get_outcome(2021).unwrap(),
            Some(ActualOutcome::champion(2021, Some("Milwaukee Bucks".into())))
        );
        assert_eq!(db.get_outcome(2022).unwrap(), Some(ActualOutcome::champion(2022, None)));
        assert_eq!(db.get_outcome(1999).unwrap(), None);
    }

    #[test]
    fn features_come_back_most_important_first() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        let features = db.list_feature_importance().unwrap();
        assert_eq!(features[0].feature, "point_diff");
        assert_eq!(features.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_source_feeds_catalog() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        let catalog = db.fetch_catalog().await.unwrap();
        assert_eq!(catalog.seasons, vec![2022, 2021]);
        assert_eq!(catalog.latest, Some(2022));
    }
}
