use crate::config::types::Config;
use crate::ConfigError;

/// Validates a loaded configuration
///
/// Every limit must be at least 1; a zero worker count or queue capacity
/// would deadlock the service rather than fail loudly.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.worker_count == 0 {
        return Err(ConfigError::Validation(
            "crawler.worker-count must be at least 1".to_string(),
        ));
    }

    if config.crawler.queue_capacity == 0 {
        return Err(ConfigError::Validation(
            "crawler.queue-capacity must be at least 1".to_string(),
        ));
    }

    if config.crawler.poll_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.poll-interval-secs must be at least 1".to_string(),
        ));
    }

    if config.crawler.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.request-timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.crawler.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.connect-timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.crawler.probe_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.probe-timeout-secs must be at least 1".to_string(),
        ));
    }

    if config.crawler.probe_concurrency == 0 {
        return Err(ConfigError::Validation(
            "crawler.probe-concurrency must be at least 1".to_string(),
        ));
    }

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path must not be empty".to_string(),
        ));
    }

    Ok(())
}
