use std::time::Duration;

/// Default time between reconciliation ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound on a single record's status query.
pub const DEFAULT_RECORD_TIMEOUT: Duration = Duration::from_secs(30);

/// Reconciler timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub interval: Duration,
    pub record_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            record_timeout: DEFAULT_RECORD_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Load settings from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `SYNC_INTERVAL_SECS`       | `5`     |
    /// | `SYNC_RECORD_TIMEOUT_SECS` | `30`    |
    pub fn from_env() -> Self {
        let interval_secs: u64 = std::env::var("SYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_INTERVAL.as_secs().to_string())
            .parse()
            .expect("SYNC_INTERVAL_SECS must be a valid u64");

        let record_timeout_secs: u64 = std::env::var("SYNC_RECORD_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_RECORD_TIMEOUT.as_secs().to_string())
            .parse()
            .expect("SYNC_RECORD_TIMEOUT_SECS must be a valid u64");

        // A zero interval would make tokio::time::interval panic.
        Self {
            interval: Duration::from_secs(interval_secs.max(1)),
            record_timeout: Duration::from_secs(record_timeout_secs.max(1)),
        }
    }
}
