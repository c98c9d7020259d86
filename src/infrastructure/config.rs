use std::env;
use std::time::Duration;

/// Pacing of repair runs against the record store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Pause between two writes of a plan. Bounds store load only.
    pub write_delay: Duration,
    /// Pause after the last write before the confirming re-scan.
    pub settle_delay: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            write_delay: Duration::from_millis(50),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl ReconcileConfig {
    /// No pacing at all. Used by tests and one-shot tooling.
    pub fn immediate() -> Self {
        Self {
            write_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub seed_demo: bool,
    pub reconcile: ReconcileConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = ReconcileConfig::default();

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://shelf_reconcile.db?mode=rwc".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            seed_demo: env::var("SEED_DEMO")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(false),
            reconcile: ReconcileConfig {
                write_delay: millis_from_env("REPAIR_WRITE_DELAY_MS")
                    .unwrap_or(defaults.write_delay),
                settle_delay: millis_from_env("REPAIR_SETTLE_DELAY_MS")
                    .unwrap_or(defaults.settle_delay),
            },
        }
    }
}

fn millis_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}
