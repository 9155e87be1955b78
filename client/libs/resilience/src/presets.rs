/// Preset timeouts for the kinds of remote calls the client makes
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Table queries and row mutations
///
/// - Timeout: 10s (list pages are bounded at 100 rows)
pub fn table_query_config() -> TimeoutConfig {
    TimeoutConfig::new(Duration::from_secs(10))
}

/// Stored-procedure calls (counter increments)
///
/// - Timeout: 5s (single-row atomic updates)
pub fn rpc_config() -> TimeoutConfig {
    TimeoutConfig::new(Duration::from_secs(5))
}

/// Object storage uploads and deletes
///
/// - Timeout: 120s (whole-file uploads, no chunking)
pub fn object_storage_config() -> TimeoutConfig {
    TimeoutConfig::new(Duration::from_secs(120))
}
