use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::analytics::pipeline::FailureStage;
use crate::analytics::{ConferenceFilter, Pipeline, SeasonBundle, SeasonFailure};
use crate::db::models::Season;
use crate::source::{self, PredictionSource};

/// Shared handler state. Nothing derived is cached: every request
/// re-reads the source and re-runs the pipeline.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn PredictionSource>,
    pub pipeline: Arc<Pipeline>,
    pub max_concurrency: usize,
}

type ApiError = (StatusCode, String);

#[derive(Debug, Default, Deserialize)]
struct SeasonQuery {
    #[serde(default)]
    conference: ConferenceFilter,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/seasons", get(seasons_handler))
        .route("/api/seasons/:season", get(season_handler))
        .route("/api/latest", get(latest_handler))
        .route("/api/historical", get(historical_handler))
        .route("/api/features", get(features_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

/// GET /api/seasons
async fn seasons_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .source
        .fetch_catalog()
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// GET /api/seasons/:season?conference=East
async fn season_handler(
    State(state): State<Arc<AppState>>,
    Path(season): Path<Season>,
    Query(query): Query<SeasonQuery>,
) -> Result<impl IntoResponse, ApiError> {
    season_bundle(&state, Some(season), query.conference)
        .await
        .map(Json)
}

/// GET /api/latest?conference=West
async fn latest_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SeasonQuery>,
) -> Result<impl IntoResponse, ApiError> {
    season_bundle(&state, None, query.conference).await.map(Json)
}

/// GET /api/historical
async fn historical_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    source::historical_report(
        Arc::clone(&state.source),
        Arc::clone(&state.pipeline),
        state.max_concurrency,
    )
    .await
    .map(Json)
    .map_err(upstream_error)
}

/// GET /api/features
async fn features_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .source
        .fetch_feature_importance()
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// Evaluate the selected season, or the latest one when none is given.
async fn season_bundle(
    state: &AppState,
    selected: Option<Season>,
    filter: ConferenceFilter,
) -> Result<SeasonBundle, ApiError> {
    let catalog = state.source.fetch_catalog().await.map_err(upstream_error)?;
    let season = catalog.resolve(selected).ok_or_else(|| {
        let message = match selected {
            Some(season) => format!("Unknown season {}", season),
            None => "No seasons available".to_string(),
        };
        (StatusCode::NOT_FOUND, message)
    })?;

    source::evaluate_one(state.source.as_ref(), &state.pipeline, season, filter)
        .await
        .map_err(failure_response)
}

fn failure_status(stage: FailureStage) -> StatusCode {
    match stage {
        FailureStage::Fetch => StatusCode::BAD_GATEWAY,
        FailureStage::Validation | FailureStage::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn failure_response(failure: SeasonFailure) -> ApiError {
    warn!(
        "Season {} request failed ({:?}): {}",
        failure.season, failure.stage, failure.message
    );
    (failure_status(failure.stage), failure.message)
}

fn upstream_error(err: anyhow::Error) -> ApiError {
    warn!("Prediction source error: {:#}", err);
    (StatusCode::BAD_GATEWAY, format!("{:#}", err))
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Title Odds</title>
<style>
  :root { --bg: #10131a; --card: #1b1f2b; --border: #2c3142; --accent: #f28c28; --text: #e4e4e4; --muted: #8a8fa8; --green: #2ecc8f; --red: #ef5364; }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: system-ui, sans-serif; }
  header { display: flex; gap: 1rem; align-items: center; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.3rem; }
  select { background: var(--card); color: var(--text); border: 1px solid var(--border); border-radius: 6px; padding: .3rem .6rem; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(190px, 1fr)); gap: 1rem; }
  .card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1rem; }
  .card .label { color: var(--muted); font-size: .75rem; text-transform: uppercase; margin-bottom: .3rem; }
  .card .value { font-size: 1.5rem; font-weight: 700; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel h2 { font-size: .95rem; padding: .8rem 1.1rem; border-bottom: 1px solid var(--border); }
  table { width: 100%; border-collapse: collapse; }
  th { text-align: left; padding: .6rem 1rem; font-size: .72rem; color: var(--muted); text-transform: uppercase; }
  td { padding: .55rem 1rem; font-size: .88rem; border-top: 1px solid var(--border); }
  .ok { color: var(--green); }
  .miss { color: var(--red); }
  .empty { color: var(--muted); text-align: center; padding: 1.5rem; }
</style>
</head>
<body>
<header>
  <h1>🏀 Title Odds</h1>
  <select id="season"></select>
  <select id="conference">
    <option value="All">All</option>
    <option value="East">East</option>
    <option value="West">West</option>
  </select>
</header>
<main>
  <div class="cards">
    <div class="card"><div class="label">Predicted Champion</div><div class="value" id="c-pred">–</div></div>
    <div class="card"><div class="label">Actual Champion</div><div class="value" id="c-actual">–</div></div>
    <div class="card"><div class="label">Champion Rank</div><div class="value" id="c-rank">–</div></div>
    <div class="card"><div class="label">Exact Accuracy</div><div class="value" id="c-exact">–</div></div>
    <div class="card"><div class="label">Top-3 Accuracy</div><div class="value" id="c-top3">–</div></div>
  </div>
  <div class="panel">
    <h2>Top Contenders</h2>
    <table>
      <thead><tr><th>Rank</th><th>Team</th><th>Conf</th><th>Wins</th><th>PPG</th><th>Diff</th><th>Probability</th></tr></thead>
      <tbody id="contenders"><tr><td colspan="7" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
  <div class="panel">
    <h2>Historical Accuracy</h2>
    <table>
      <thead><tr><th>Season</th><th>Predicted</th><th>Actual</th><th>Rank</th><th>Result</th></tr></thead>
      <tbody id="history"><tr><td colspan="5" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
</main>
<script>
const pct = v => (v * 100).toFixed(1) + '%';
const seasonSel = document.getElementById('season');
const confSel = document.getElementById('conference');

async function loadSeasons() {
  const r = await fetch('/api/seasons');
  if (!r.ok) return;
  const c = await r.json();
  seasonSel.innerHTML = c.seasons.map(s => `<option value="${s}">${s}-${String(s + 1).slice(2)}</option>`).join('');
  if (c.latest != null) seasonSel.value = c.latest;
}

async function loadSeason() {
  const tbody = document.getElementById('contenders');
  const r = await fetch(`/api/seasons/${seasonSel.value}?conference=${confSel.value}`);
  if (!r.ok) { tbody.innerHTML = `<tr><td colspan="7" class="empty">${await r.text()}</td></tr>`; return; }
  const b = await r.json();
  document.getElementById('c-pred').textContent = b.record.predicted_champion;
  document.getElementById('c-actual').textContent = b.record.actual_champion ?? 'TBD';
  document.getElementById('c-rank').textContent = b.record.actual_champion_rank ?? '–';
  const rows = b.contenders.top_contenders;
  if (!rows.length) { tbody.innerHTML = '<tr><td colspan="7" class="empty">No teams</td></tr>'; return; }
  tbody.innerHTML = rows.map(t => `<tr>
    <td>${t.rank}</td><td>${t.team_name}</td><td>${t.conference ?? '–'}</td>
    <td>${t.wins.toFixed(0)}</td><td>${t.points_per_game.toFixed(1)}</td>
    <td>${t.point_diff.toFixed(1)}</td><td>${pct(t.championship_probability)}</td>
  </tr>`).join('');
}

async function loadHistory() {
  const r = await fetch('/api/historical');
  if (!r.ok) return;
  const h = await r.json();
  document.getElementById('c-exact').textContent = pct(h.accuracy.exact_accuracy);
  document.getElementById('c-top3').textContent = pct(h.accuracy.top3_accuracy);
  const tbody = document.getElementById('history');
  const rows = h.accuracy.series.slice().reverse();
  if (!rows.length) { tbody.innerHTML = '<tr><td colspan="5" class="empty">No completed seasons</td></tr>'; return; }
  tbody.innerHTML = rows.map(s => `<tr>
    <td>${s.season}</td><td>${s.predicted_champion}</td><td>${s.actual_champion}</td>
    <td>${s.actual_champion_rank}</td>
    <td class="${s.correct ? 'ok' : 'miss'}">${s.correct ? 'Hit' : 'Miss'}</td>
  </tr>`).join('');
}

seasonSel.addEventListener('change', loadSeason);
confSel.addEventListener('change', loadSeason);
loadSeasons().then(loadSeason);
loadHistory();
</script>
</body>
</html>"#;
