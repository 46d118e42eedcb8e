use rusqlite::Connection;

use crate::error::ChartError;

/// One `[id, name]` catalog row, serialized as a JSON pair.
pub type CatalogEntry = (i64, String);

/// Instrument catalog: every `[id, currency_name]` pair, ascending by id.
pub fn fetch_currencies(conn: &Connection) -> Result<Vec<CatalogEntry>, ChartError> {
    fetch_catalog(conn, "SELECT id, currency_name FROM currency ORDER BY id ASC")
}

/// Signal-type catalog: every `[id, ind_signal]` pair, ascending by id.
pub fn fetch_signal_types(conn: &Connection) -> Result<Vec<CatalogEntry>, ChartError> {
    fetch_catalog(conn, "SELECT id, ind_signal FROM ind_signal ORDER BY id ASC")
}

fn fetch_catalog(conn: &Connection, sql: &str) -> Result<Vec<CatalogEntry>, ChartError> {
    let mut stmt = conn.prepare(sql)?;
    let rows: Vec<CatalogEntry> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
