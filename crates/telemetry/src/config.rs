use std::time::Duration;

/// Knobs for the Tracker, read once at construction. All defaults match
/// the values the pipeline shipped with before any environment override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub buffer_size: usize,
    pub worker_pool_size: usize,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            flush_interval: Duration::from_secs(5),
            buffer_size: 1000,
            worker_pool_size: 10,
            retry_attempts: 3,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

impl TrackerConfig {
    /// Read configuration from the environment, falling back to the
    /// default for any variable that is absent or fails to parse. Never
    /// panics on malformed input.
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: env_usize("CREDENTIAL_TRACKING_BATCH_SIZE", default.batch_size),
            flush_interval: env_duration(
                "CREDENTIAL_TRACKING_FLUSH_INTERVAL",
                default.flush_interval,
            ),
            buffer_size: env_usize("CREDENTIAL_TRACKING_BUFFER_SIZE", default.buffer_size),
            worker_pool_size: env_usize(
                "CREDENTIAL_TRACKING_WORKER_POOL_SIZE",
                default.worker_pool_size,
            ),
            retry_attempts: env_u32("CREDENTIAL_TRACKING_RETRY_ATTEMPTS", default.retry_attempts),
            retry_backoff: env_duration(
                "CREDENTIAL_TRACKING_RETRY_BACKOFF",
                default.retry_backoff,
            ),
        }
    }
}

fn env_usize(key: &str, fallback: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(fallback)
}

fn env_u32(key: &str, fallback: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(fallback)
}

/// Parse a duration string shaped like `"5s"`, `"250ms"`, or a bare
/// integer (seconds). Anything else falls back to `fallback`.
fn env_duration(key: &str, fallback: Duration) -> Duration {
    std::env::var(key).ok().and_then(|v| parse_duration(&v)).unwrap_or(fallback)
}

fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if let Some(ms) = raw.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = raw.strip_suffix('s') {
        return secs.trim().parse::<u64>().ok().map(Duration::from_secs);
    }
    raw.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = TrackerConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert_eq!(config.buffer_size, 1000);
        assert_eq!(config.worker_pool_size, 10);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_backoff, Duration::from_secs(1));
    }

    #[test]
    fn parses_duration_suffixes() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("not-a-duration"), None);
    }
}
