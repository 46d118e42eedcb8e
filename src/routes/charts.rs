use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::chart::filter::SelectionSet;
use crate::chart::orchestrator::{
    ChartRequest, CycleOutcome, Orchestrator, SqliteChartSource,
};
use crate::db::candles::{fetch_candles, Candle, TraderTable};
use crate::db::catalog::{fetch_currencies, fetch_signal_types};
use crate::db::signals::{fetch_signals, Signal};
use crate::error::ChartError;
use crate::state::AppState;

// ── Wire tuples ──────────────────────────────────────────────────────────
//
// The front end consumes positional JSON arrays, not objects.  Tuple
// structs keep the column order explicit.

/// `[ts, low, open, close, high]`
#[derive(Debug, Serialize)]
pub struct CandleTuple(i64, f64, f64, f64, f64);

impl From<&Candle> for CandleTuple {
    fn from(c: &Candle) -> Self {
        Self(c.ts, c.low, c.open, c.close, c.high)
    }
}

/// `[start_ts, end_ts, source, signal_type]`
#[derive(Debug, Serialize)]
pub struct SignalTuple(i64, i64, String, String);

impl From<&Signal> for SignalTuple {
    fn from(s: &Signal) -> Self {
        Self(s.start_ts, s.end_ts, s.source.clone(), s.signal_type.clone())
    }
}

// ── Path / query parsing ─────────────────────────────────────────────────

type RangePath = Path<(String, i64, String, String)>;

fn parse_table(s: &str) -> Result<TraderTable, ChartError> {
    TraderTable::parse(s).ok_or_else(|| ChartError::BadRequest(format!("unknown table: {s}")))
}

/// Range path segments accept epoch milliseconds or a `YYYY-MM-DD HH:MM`
/// datetime (the front end's datetime-local inputs, interpreted as UTC;
/// a literal `T` separator is accepted too).
fn parse_range_instant(s: &str) -> Result<i64, ChartError> {
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    Err(ChartError::BadRequest(format!("invalid range instant: {s}")))
}

fn parse_request(
    table: &str,
    currency_id: i64,
    start: &str,
    end: &str,
) -> Result<ChartRequest, ChartError> {
    Ok(ChartRequest {
        table: parse_table(table)?,
        currency_id,
        start_ms: parse_range_instant(start)?,
        end_ms: parse_range_instant(end)?,
    })
}

#[derive(Debug, Deserialize)]
pub struct AnnotationQuery {
    /// Comma-separated source names; absent or `all` means no restriction.
    #[serde(default)]
    sources: Option<String>,
    /// Comma-separated signal-type names; absent or `all` means no restriction.
    #[serde(default)]
    types: Option<String>,
}

fn selection_from_param(param: Option<&str>) -> SelectionSet {
    match param {
        None => SelectionSet::All,
        Some(raw) => SelectionSet::from_members(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        ),
    }
}

// ── Route definitions ────────────────────────────────────────────────────

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/data/:table/:currency/:start/:end", get(api_data))
        .route("/nashsignals/:table/:currency/:start/:end", get(api_signals))
        .route("/currency", get(api_currency))
        .route("/ind_signal", get(api_ind_signal))
        .route("/annotations/:table/:currency/:start/:end", get(api_annotations))
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn api_data(
    State(state): State<Arc<AppState>>,
    Path((table, currency, start, end)): RangePath,
) -> Result<Json<Vec<CandleTuple>>, ChartError> {
    let req = parse_request(&table, currency, &start, &end)?;
    let conn = state.db()?;
    let candles = fetch_candles(&conn, req.table, req.currency_id, req.start_ms, req.end_ms)?;
    Ok(Json(candles.iter().map(CandleTuple::from).collect()))
}

async fn api_signals(
    State(state): State<Arc<AppState>>,
    Path((table, currency, start, end)): RangePath,
) -> Result<Json<Vec<SignalTuple>>, ChartError> {
    let req = parse_request(&table, currency, &start, &end)?;
    let conn = state.db()?;
    let signals = fetch_signals(&conn, req.currency_id, req.start_ms, req.end_ms)?;
    Ok(Json(signals.iter().map(SignalTuple::from).collect()))
}

async fn api_currency(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<(i64, String)>>, ChartError> {
    let conn = state.db()?;
    Ok(Json(fetch_currencies(&conn)?))
}

async fn api_ind_signal(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<(i64, String)>>, ChartError> {
    let conn = state.db()?;
    Ok(Json(fetch_signal_types(&conn)?))
}

/// Server-side derivation of the chart pipeline: fetch both series, build
/// annotations, apply the two-axis filter.  Keeps server and client
/// filtering consistent — the same code paths the orchestrator runs.
async fn api_annotations(
    State(state): State<Arc<AppState>>,
    Path((table, currency, start, end)): RangePath,
    Query(q): Query<AnnotationQuery>,
) -> Result<Json<Value>, ChartError> {
    let req = parse_request(&table, currency, &start, &end)?;
    let pool = state
        .pool
        .clone()
        .ok_or_else(|| ChartError::Db("chart database not available".to_string()))?;

    let mut orch = Orchestrator::new(SqliteChartSource::new(pool), state.config.display_tz);
    orch.set_source_selection(selection_from_param(q.sources.as_deref()));
    orch.set_type_selection(selection_from_param(q.types.as_deref()));

    match orch.refresh(req).await {
        CycleOutcome::Ready(count) => {
            let snap = orch
                .snapshot()
                .ok_or_else(|| ChartError::Internal("ready cycle without snapshot".to_string()))?;
            Ok(Json(json!({
                "annotations": snap.filtered,
                "count": count,
            })))
        }
        CycleOutcome::Failed(e) => Err(e),
        // One-shot orchestrator; nothing can supersede this cycle.
        CycleOutcome::Stale => Err(ChartError::Internal("one-shot cycle went stale".to_string())),
    }
}
