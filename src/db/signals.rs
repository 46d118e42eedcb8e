use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::ChartError;

/// A labeled interval overlaid on the candle series: a trading
/// recommendation from some source, between two instants (epoch ms).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub start_ts: i64,
    pub end_ts: i64,
    pub source: String,
    pub signal_type: String,
}

/// Fetch signals for a currency whose start time falls in
/// `[start_ms, end_ms]`, joined against the signal-type catalog for the
/// type name, ascending by start time.
pub fn fetch_signals(
    conn: &Connection,
    currency_id: i64,
    start_ms: i64,
    end_ms: i64,
) -> Result<Vec<Signal>, ChartError> {
    let mut stmt = conn.prepare(
        "SELECT s.date_started, s.date_ended, s.source, i.ind_signal
         FROM nash_signals s
         JOIN ind_signal i ON s.signal_type = i.id
         WHERE s.currency_id = ?1 AND s.date_started BETWEEN ?2 AND ?3
         ORDER BY s.date_started ASC",
    )?;

    let signals: Vec<Signal> = stmt
        .query_map(params![currency_id, start_ms, end_ms], |row| {
            Ok(Signal {
                start_ts: row.get(0)?,
                end_ts: row.get(1)?,
                source: row.get(2)?,
                signal_type: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_db_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("chart_hub_{tag}_{nanos}.db"))
    }

    fn init_signal_db(path: &PathBuf) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE ind_signal (id INTEGER PRIMARY KEY, ind_signal TEXT NOT NULL);
            INSERT INTO ind_signal VALUES (1, 'BUY');
            INSERT INTO ind_signal VALUES (2, 'SELL SOON');
            CREATE TABLE nash_signals (
                currency_id INTEGER NOT NULL,
                date_started INTEGER NOT NULL,
                date_ended INTEGER NOT NULL,
                source TEXT NOT NULL,
                signal_type INTEGER NOT NULL REFERENCES ind_signal(id)
            );
            INSERT INTO nash_signals VALUES (10, 5000, 7000, 'macd', 2);
            INSERT INTO nash_signals VALUES (10, 1000, 4000, 'rsi', 1);
            INSERT INTO nash_signals VALUES (99, 2000, 3000, 'rsi', 1);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn fetch_signals_joins_type_names_and_sorts() {
        let path = tmp_db_path("signals");
        let conn = init_signal_db(&path);

        let signals = fetch_signals(&conn, 10, 0, 10_000).unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(
            signals[0],
            Signal {
                start_ts: 1000,
                end_ts: 4000,
                source: "rsi".to_string(),
                signal_type: "BUY".to_string(),
            }
        );
        assert_eq!(signals[1].signal_type, "SELL SOON");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn fetch_signals_respects_start_range() {
        let path = tmp_db_path("signals_range");
        let conn = init_signal_db(&path);

        let signals = fetch_signals(&conn, 10, 4000, 10_000).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].source, "macd");

        std::fs::remove_file(&path).ok();
    }
}
