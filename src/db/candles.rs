use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::ChartError;

/// One OHLC price bar.  Timestamps are epoch milliseconds, unique and
/// ascending within any fetched range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Allow-listed candle tables, one per trader timeframe.
///
/// Path segments arrive as externally-controlled strings; only the static
/// names returned by [`TraderTable::table_name`] ever reach SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraderTable {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D,
}

impl TraderTable {
    pub const ALL: [TraderTable; 7] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H4,
        Self::D,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trader_M1" => Some(Self::M1),
            "trader_M5" => Some(Self::M5),
            "trader_M15" => Some(Self::M15),
            "trader_M30" => Some(Self::M30),
            "trader_H1" => Some(Self::H1),
            "trader_H4" => Some(Self::H4),
            "trader_D" => Some(Self::D),
            _ => None,
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            Self::M1 => "trader_M1",
            Self::M5 => "trader_M5",
            Self::M15 => "trader_M15",
            Self::M30 => "trader_M30",
            Self::H1 => "trader_H1",
            Self::H4 => "trader_H4",
            Self::D => "trader_D",
        }
    }
}

/// Fetch candles for a currency over `[start_ms, end_ms]` from the given
/// trader table, ascending by open time.
pub fn fetch_candles(
    conn: &Connection,
    table: TraderTable,
    currency_id: i64,
    start_ms: i64,
    end_ms: i64,
) -> Result<Vec<Candle>, ChartError> {
    let sql = format!(
        "SELECT date_candle_started, open, high, low, close
         FROM {}
         WHERE currency_id = ?1 AND date_candle_started BETWEEN ?2 AND ?3
         ORDER BY date_candle_started ASC",
        table.table_name()
    );
    let mut stmt = conn.prepare(&sql)?;

    let candles: Vec<Candle> = stmt
        .query_map(params![currency_id, start_ms, end_ms], |row| {
            Ok(Candle {
                ts: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(candles)
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

    fn init_candle_db(path: &PathBuf) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE trader_M5 (
                currency_id INTEGER NOT NULL,
                date_candle_started INTEGER NOT NULL,
                open REAL, high REAL, low REAL, close REAL
            );
            INSERT INTO trader_M5 VALUES (10, 3000, 1.2, 1.4, 1.1, 1.3);
            INSERT INTO trader_M5 VALUES (10, 1000, 1.0, 1.2, 0.9, 1.1);
            INSERT INTO trader_M5 VALUES (10, 2000, 1.1, 1.3, 1.0, 1.2);
            INSERT INTO trader_M5 VALUES (99, 1500, 9.0, 9.0, 9.0, 9.0);
            INSERT INTO trader_M5 VALUES (10, 9000, 2.0, 2.1, 1.9, 2.0);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn fetch_candles_filters_and_sorts_ascending() {
        let path = tmp_db_path("candles");
        let conn = init_candle_db(&path);

        let candles = fetch_candles(&conn, TraderTable::M5, 10, 0, 5000).unwrap();
        assert_eq!(
            candles.iter().map(|c| c.ts).collect::<Vec<_>>(),
            vec![1000, 2000, 3000]
        );
        assert_eq!(candles[0].open, 1.0);
        assert_eq!(candles[2].high, 1.4);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn fetch_candles_empty_range_is_ok() {
        let path = tmp_db_path("candles_empty");
        let conn = init_candle_db(&path);

        let candles = fetch_candles(&conn, TraderTable::M5, 10, 100_000, 200_000).unwrap();
        assert!(candles.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn table_names_round_trip_through_parse() {
        for table in TraderTable::ALL {
            assert_eq!(TraderTable::parse(table.table_name()), Some(table));
        }
    }

    #[test]
    fn parse_rejects_unlisted_identifiers() {
        assert_eq!(TraderTable::parse("trader_M2"), None);
        assert_eq!(TraderTable::parse("trader_m5"), None);
        assert_eq!(TraderTable::parse("trader_M5; DROP TABLE trader_M5"), None);
        assert_eq!(TraderTable::parse(""), None);
    }
}
