#![forbid(unsafe_code)]

use std::time::Duration;

/// Timing configuration for readiness polling.
#[derive(Debug, Clone)]
pub struct ReadinessOptions {
    /// Sleep between poll iterations.
    pub poll_interval: Duration,
    /// Fresh budget granted to the startup-window phase after a self-heal.
    pub startup_window_timeout: Duration,
    /// Overall budget for a single-segment wait.
    pub segment_timeout: Duration,
    /// How long a successful segment check suppresses re-checking the
    /// filesystem. Applies to segments only, never to manifests.
    pub microcache_ttl: Duration,
}

impl Default for ReadinessOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            startup_window_timeout: Duration::from_secs(20),
            segment_timeout: Duration::from_secs(20),
            microcache_ttl: Duration::from_secs(2),
        }
    }
}
