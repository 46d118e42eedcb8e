use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;

/// Hub configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub bind: String,
    pub port: u16,

    /// SQLite database holding the candle tables, signals, and catalogs.
    pub db_path: PathBuf,

    /// Directory of static front-end files served as the router fallback.
    pub static_dir: PathBuf,

    /// Canonical timezone for all user-facing timestamp rendering.  Applied
    /// uniformly regardless of server locale.
    pub display_tz: Tz,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

impl ChartConfig {
    pub fn from_env() -> Self {
        let display_tz = env_str("CHART_DISPLAY_TZ", "America/Chicago")
            .parse()
            .unwrap_or(chrono_tz::America::Chicago);

        Self {
            bind: env_str("CHART_BIND", "127.0.0.1"),
            port: env_u16("CHART_PORT", 3002),
            db_path: env_path("CHART_DB", "charts.db"),
            static_dir: env_path("CHART_STATIC_DIR", "public"),
            display_tz,
        }
    }
}
