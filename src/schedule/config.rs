use chrono::Duration;

/// Tunables for the ad/program cache and mute look-ahead.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum age of cached ad windows before a refetch
    pub window_ttl: Duration,

    /// Maximum age of the cached programme; EPG data moves slowly
    pub program_ttl: Duration,

    /// Windows separated by at most this much are treated as one break
    pub max_merge_gap: Duration,

    /// Mute this long before a scheduled window starts
    pub lookahead: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            window_ttl: Duration::seconds(3),
            program_ttl: Duration::seconds(30),
            max_merge_gap: Duration::seconds(60),
            lookahead: Duration::seconds(10),
        }
    }
}
