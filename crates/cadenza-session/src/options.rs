#![forbid(unsafe_code)]

use chrono::Duration;

/// Session lifecycle configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Session record TTL; heartbeats re-extend by this much.
    pub session_ttl: Duration,
    /// Wall-clock validity embedded in minted tokens. Continuity rules can
    /// keep a token acceptable past this as long as the session is alive.
    pub token_ttl: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(2),
            token_ttl: Duration::hours(6),
        }
    }
}
