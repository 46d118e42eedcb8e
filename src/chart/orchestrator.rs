use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Serialize;

use crate::chart::annotate::{build_annotations, Annotation};
use crate::chart::filter::{filter_annotations, SelectionSet};
use crate::db::candles::{Candle, TraderTable};
use crate::db::pool::DbPool;
use crate::db::signals::Signal;
use crate::db::{candles, signals};
use crate::error::ChartError;

/// Key identifying one fetch cycle: which table, instrument, and range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartRequest {
    pub table: TraderTable,
    pub currency_id: i64,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Seam the orchestrator fetches through; both queries are read-only and
/// awaited together for the same request key.
#[async_trait]
pub trait ChartDataSource: Send + Sync {
    async fn candles(&self, req: &ChartRequest) -> Result<Vec<Candle>, ChartError>;
    async fn signals(&self, req: &ChartRequest) -> Result<Vec<Signal>, ChartError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Building,
    Filtering,
    Ready,
    Failed,
}

/// Output of a completed cycle: the candle series, the full annotation set
/// built against it, and the current filtered view with its cardinality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub candles: Vec<Candle>,
    pub annotations: Vec<Annotation>,
    pub filtered: Vec<Annotation>,
    pub count: usize,
}

/// Discrete UI events the orchestrator consumes.  Selection changes apply
/// synchronously to the newest annotation set; a range change starts a
/// fresh fetch cycle.
#[derive(Debug, Clone)]
pub enum ChartEvent {
    RangeChanged(ChartRequest),
    SourceSelectionChanged(SelectionSet),
    TypeSelectionChanged(SelectionSet),
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// The filtered annotation count now visible to the renderer.
    Ready(usize),
    /// A newer cycle superseded this one; the result was discarded.
    Stale,
    Failed(ChartError),
}

/// Sequences fetch → build → filter → hand-off for one chart consumer.
///
/// Every cycle carries a monotonically increasing sequence number; only the
/// most recently started cycle may publish a snapshot, so a late response
/// from a superseded request can never pair stale candles with fresh
/// signals or overwrite a newer render.  A failed cycle leaves the previous
/// snapshot untouched.
pub struct Orchestrator<S> {
    source: S,
    display_tz: Tz,
    phase: Phase,
    latest_seq: u64,
    sources: SelectionSet,
    types: SelectionSet,
    snapshot: Option<ChartSnapshot>,
}

impl<S: ChartDataSource> Orchestrator<S> {
    pub fn new(source: S, display_tz: Tz) -> Self {
        Self {
            source,
            display_tz,
            phase: Phase::Idle,
            latest_seq: 0,
            sources: SelectionSet::All,
            types: SelectionSet::All,
            snapshot: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Latest published snapshot, if any cycle has reached `Ready`.
    pub fn snapshot(&self) -> Option<&ChartSnapshot> {
        self.snapshot.as_ref()
    }

    pub async fn handle_event(&mut self, event: ChartEvent) -> CycleOutcome {
        match event {
            ChartEvent::RangeChanged(req) => self.refresh(req).await,
            ChartEvent::SourceSelectionChanged(sel) => {
                CycleOutcome::Ready(self.set_source_selection(sel))
            }
            ChartEvent::TypeSelectionChanged(sel) => {
                CycleOutcome::Ready(self.set_type_selection(sel))
            }
        }
    }

    pub fn set_source_selection(&mut self, sel: SelectionSet) -> usize {
        self.sources = sel;
        self.refilter()
    }

    pub fn set_type_selection(&mut self, sel: SelectionSet) -> usize {
        self.types = sel;
        self.refilter()
    }

    /// Run one full cycle for `req`.  Equivalent to `begin_cycle` followed by
    /// `complete_cycle` with both fetches awaited together.
    pub async fn refresh(&mut self, req: ChartRequest) -> CycleOutcome {
        let seq = self.begin_cycle();
        let source = &self.source;
        let (candles, signals) = tokio::join!(source.candles(&req), source.signals(&req));
        self.complete_cycle(seq, candles, signals)
    }

    /// Issue a new cycle sequence number, superseding any in-flight cycle.
    pub fn begin_cycle(&mut self) -> u64 {
        self.latest_seq += 1;
        self.phase = Phase::Fetching;
        self.latest_seq
    }

    /// Feed the fetch results of cycle `seq` back into the state machine.
    ///
    /// Results from any cycle other than the latest are silently discarded —
    /// superseding is cooperative, not preemptive.
    pub fn complete_cycle(
        &mut self,
        seq: u64,
        candles: Result<Vec<Candle>, ChartError>,
        signals: Result<Vec<Signal>, ChartError>,
    ) -> CycleOutcome {
        if seq != self.latest_seq {
            tracing::debug!(seq, latest = self.latest_seq, "discarding stale fetch cycle");
            return CycleOutcome::Stale;
        }

        let (candles, signals) = match (candles, signals) {
            (Ok(c), Ok(s)) => (c, s),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("fetch cycle {seq} failed: {e}");
                self.phase = Phase::Failed;
                return CycleOutcome::Failed(e);
            }
        };

        self.phase = Phase::Building;
        let annotations = match build_annotations(&signals, &candles, self.display_tz) {
            Ok(a) => a,
            Err(e) => {
                self.phase = Phase::Failed;
                return CycleOutcome::Failed(e);
            }
        };

        self.phase = Phase::Filtering;
        let filtered = filter_annotations(&annotations, &self.sources, &self.types);
        let count = filtered.len();

        self.snapshot = Some(ChartSnapshot {
            candles,
            annotations,
            filtered,
            count,
        });
        self.phase = Phase::Ready;
        CycleOutcome::Ready(count)
    }

    fn refilter(&mut self) -> usize {
        match &mut self.snapshot {
            Some(snap) => {
                snap.filtered = filter_annotations(&snap.annotations, &self.sources, &self.types);
                snap.count = snap.filtered.len();
                snap.count
            }
            None => 0,
        }
    }
}

/// SQLite-backed data source over the shared read-only pool.
pub struct SqliteChartSource {
    pool: DbPool,
}

impl SqliteChartSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, ChartError>
    {
        Ok(self.pool.get()?)
    }
}

#[async_trait]
impl ChartDataSource for SqliteChartSource {
    async fn candles(&self, req: &ChartRequest) -> Result<Vec<Candle>, ChartError> {
        let conn = self.conn()?;
        candles::fetch_candles(&conn, req.table, req.currency_id, req.start_ms, req.end_ms)
    }

    async fn signals(&self, req: &ChartRequest) -> Result<Vec<Signal>, ChartError> {
        let conn = self.conn()?;
        signals::fetch_signals(&conn, req.currency_id, req.start_ms, req.end_ms)
    }
}
