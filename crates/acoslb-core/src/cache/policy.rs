use std::time::Duration;

/// Timing and retry knobs for a [`ClientCache`](super::ClientCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age after which a cached session is refreshed on next use.
    pub ttl: Duration,
    /// Session probes before creation gives up.
    pub create_attempts: u32,
    /// Close requests before a session is abandoned.
    pub close_attempts: u32,
    /// Pause between consecutive probe or close attempts.
    pub retry_delay: Duration,
    /// How long shutdown waits for outstanding closes.
    pub shutdown_grace: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            create_attempts: 9,
            close_attempts: 9,
            retry_delay: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}
