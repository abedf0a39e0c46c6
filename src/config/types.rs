use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Pagelens
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers draining the queue
    #[serde(rename = "worker-count")]
    pub worker_count: usize,

    /// Capacity of the bounded in-process work queue
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Interval between storage polls for queued items (seconds)
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Per-request timeout for page fetches (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout for the HTTP client (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for link liveness probes (seconds)
    #[serde(rename = "probe-timeout-secs")]
    pub probe_timeout_secs: u64,

    /// Maximum number of liveness probes in flight per page
    #[serde(rename = "probe-concurrency")]
    pub probe_concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            queue_capacity: 100,
            poll_interval_secs: 10,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            probe_timeout_secs: 10,
            probe_concurrency: 8,
        }
    }
}

impl CrawlerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./pagelens.db".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_constants() {
        let config = Config::default();
        assert_eq!(config.crawler.worker_count, 3);
        assert_eq!(config.crawler.queue_capacity, 100);
        assert_eq!(config.crawler.poll_interval_secs, 10);
        assert_eq!(config.crawler.request_timeout_secs, 30);
    }

    #[test]
    fn test_duration_helpers() {
        let config = CrawlerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
