//! Resolved configuration consumed by the shipping engine.
//!
//! Loading (files, environment variables) is a caller concern; the engine
//! only ever sees this fully resolved struct. Defaults mirror the fixed
//! limits in [`crate::constants`], and blank credentials are replaced with
//! fixed fallbacks so a misconfigured host application still ships
//! identifiable data instead of crashing.

use std::time::Duration;

use crate::constants;

/// Resolved endpoint, credentials, and tuning knobs for one shipper.
#[derive(Debug, Clone)]
pub struct CourierConfig {
    /// Full URL of the log intake endpoint (POST).
    pub logs_url: String,
    /// Full URL of the time endpoint (GET). Same as `logs_url` by default.
    pub time_url: String,
    /// Tenant private key placed in every envelope.
    pub private_key: String,
    /// Application name placed in every envelope.
    pub application_name: String,
    /// Subsystem name placed in every envelope.
    pub subsystem_name: String,
    /// When set, the HTTP client ignores proxy environment variables.
    pub disable_proxy: bool,
    /// Connect/read timeout for HTTP exchanges.
    pub http_timeout: Duration,
    /// Attempts per logical send before the chunk is dropped.
    pub retry_count: usize,
    /// Fixed delay between failed attempts.
    pub retry_interval: Duration,
    /// Buffer ceiling in estimated bytes; appends beyond it are dropped.
    pub max_buffer_size: usize,
    /// Chunk ceiling in estimated bytes for a single outbound request.
    pub max_chunk_size: usize,
    /// Send-loop sleep under low buffer pressure.
    pub normal_interval: Duration,
    /// Send-loop sleep once the buffer holds more than half a chunk.
    pub fast_interval: Duration,
    /// Minimum time between clock synchronization requests.
    pub resync_interval: Duration,
    /// Append a self-announcement record when the shipper is created.
    pub announce_startup: bool,
}

impl CourierConfig {
    /// Builds a config for `base_url` with default limits and cadences.
    ///
    /// Blank credentials fall back to the fixed sentinels
    /// ([`constants::FAILED_PRIVATE_KEY`], [`constants::NO_APP_NAME`],
    /// [`constants::NO_SUB_SYSTEM`]). The intake and time endpoints share
    /// the same `<base_url>/api/v1/logs` URL.
    #[must_use]
    pub fn new(
        base_url: &str,
        private_key: &str,
        application_name: &str,
        subsystem_name: &str,
    ) -> Self {
        let url = format!("{}{}", base_url.trim_end_matches('/'), constants::LOGS_PATH);
        CourierConfig {
            logs_url: url.clone(),
            time_url: url,
            private_key: or_default(private_key, constants::FAILED_PRIVATE_KEY),
            application_name: or_default(application_name, constants::NO_APP_NAME),
            subsystem_name: or_default(subsystem_name, constants::NO_SUB_SYSTEM),
            disable_proxy: false,
            http_timeout: constants::HTTP_TIMEOUT,
            retry_count: constants::HTTP_SEND_RETRY_COUNT,
            retry_interval: constants::HTTP_SEND_RETRY_INTERVAL,
            max_buffer_size: constants::MAX_LOG_BUFFER_SIZE,
            max_chunk_size: constants::MAX_LOG_CHUNK_SIZE,
            normal_interval: constants::NORMAL_SEND_SPEED_INTERVAL,
            fast_interval: constants::FAST_SEND_SPEED_INTERVAL,
            resync_interval: constants::SYNC_TIME_UPDATE_INTERVAL,
            announce_startup: true,
        }
    }
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_endpoint_urls() {
        let config = CourierConfig::new("https://ingress.example.com:443", "key", "app", "sub");

        assert_eq!(config.logs_url, "https://ingress.example.com:443/api/v1/logs");
        assert_eq!(config.time_url, config.logs_url);
    }

    #[test]
    fn test_new_strips_trailing_slash() {
        let config = CourierConfig::new("https://ingress.example.com/", "key", "app", "sub");

        assert_eq!(config.logs_url, "https://ingress.example.com/api/v1/logs");
    }

    #[test]
    fn test_blank_credentials_fall_back() {
        let config = CourierConfig::new("https://ingress.example.com", "", "  ", "");

        assert_eq!(config.private_key, constants::FAILED_PRIVATE_KEY);
        assert_eq!(config.application_name, constants::NO_APP_NAME);
        assert_eq!(config.subsystem_name, constants::NO_SUB_SYSTEM);
    }

    #[test]
    fn test_supplied_credentials_kept() {
        let config = CourierConfig::new("https://ingress.example.com", "pk", "orders", "checkout");

        assert_eq!(config.private_key, "pk");
        assert_eq!(config.application_name, "orders");
        assert_eq!(config.subsystem_name, "checkout");
    }

    #[test]
    fn test_default_limits() {
        let config = CourierConfig::new("https://ingress.example.com", "pk", "a", "s");

        assert_eq!(config.max_buffer_size, constants::MAX_LOG_BUFFER_SIZE);
        assert_eq!(config.max_chunk_size, constants::MAX_LOG_CHUNK_SIZE);
        assert_eq!(config.retry_count, constants::HTTP_SEND_RETRY_COUNT);
        assert!(config.announce_startup);
        assert!(!config.disable_proxy);
    }
}
