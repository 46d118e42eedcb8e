use std::sync::Arc;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::ChartConfig;
use crate::db::pool::{open_ro_pool, DbPool};
use crate::error::ChartError;

/// Shared application state, passed to all route handlers via
/// `axum::extract::State`.  Requests are stateless; the only shared pieces
/// are the config and the read-only connection pool.
pub struct AppState {
    pub config: ChartConfig,

    /// `None` if the DB file does not exist yet.
    pub pool: Option<DbPool>,
}

impl AppState {
    pub fn new(config: ChartConfig) -> Arc<Self> {
        let pool = open_ro_pool(&config.db_path, 4);
        Arc::new(Self { config, pool })
    }

    pub fn db(&self) -> Result<PooledConnection<SqliteConnectionManager>, ChartError> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| ChartError::Db("chart database not available".to_string()))?;
        Ok(pool.get()?)
    }
}
