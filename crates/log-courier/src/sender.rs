//! HTTP exchange with the ingestion endpoint.
//!
//! One sender owns the persistent HTTP client for the whole process. The
//! client is built lazily on first use; if construction fails, the failure
//! is logged and the next call retries initialization. All send attempts
//! are serialized behind a single async lock held across the entire retry
//! loop, so at most one request is in flight process-wide at any time.
//! This trades throughput for safety around the shared connection pool.
//!
//! # Retry Policy
//!
//! A logical send makes up to [`retry_count`](crate::config::CourierConfig::retry_count)
//! attempts with a fixed delay between them. Only transport-level errors
//! (connect, timeout, TLS) consume attempts; any HTTP response, success or
//! not, ends the send as a transport success with the status logged. After
//! exhaustion the chunk is dropped, never requeued: delivery is
//! best-effort by design.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::config::CourierConfig;
use crate::error::ShipError;
use crate::record::BulkEnvelope;

/// Idle timeout for pooled connections.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(270);

/// TCP keep-alive probe interval, to detect dead connections.
const TCP_KEEPALIVE: Duration = Duration::from_secs(120);

/// Serialized, retrying HTTP sender for bulk envelopes and time queries.
#[derive(Debug)]
pub struct HttpSender {
    logs_url: String,
    time_url: String,
    disable_proxy: bool,
    timeout: Duration,
    retry_count: usize,
    retry_interval: Duration,
    /// Lazily initialized client. Holding this lock across the retry loop
    /// is what serializes sends process-wide.
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpSender {
    #[must_use]
    pub fn new(config: &CourierConfig) -> Self {
        HttpSender {
            logs_url: config.logs_url.clone(),
            time_url: config.time_url.clone(),
            disable_proxy: config.disable_proxy,
            timeout: config.http_timeout,
            retry_count: config.retry_count.max(1),
            retry_interval: config.retry_interval,
            client: Mutex::new(None),
        }
    }

    /// Posts the envelope, retrying transport failures.
    ///
    /// Returns `true` on the first attempt that reaches the server, `false`
    /// once the attempt budget is exhausted or the envelope cannot be
    /// serialized. Nothing is requeued on failure and no error escapes.
    pub async fn send(&self, envelope: &BulkEnvelope) -> bool {
        let body = match Self::encode(envelope) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize bulk envelope, skipping send: {}", e);
                return false;
            }
        };

        let mut slot = self.client.lock().await;

        for attempt in 1..=self.retry_count {
            if attempt > 1 {
                tokio::time::sleep(self.retry_interval).await;
            }

            let client = match self.get_or_init(&mut slot) {
                Ok(client) => client,
                Err(e) => {
                    error!("HTTP client initialization failed: {}", e);
                    continue;
                }
            };

            debug!(
                "Sending bulk of {} entries, attempt {}/{}",
                envelope.log_entries.len(),
                attempt,
                self.retry_count
            );

            match client
                .post(&self.logs_url)
                .header("Content-Type", "application/json")
                .body(body.clone())
                .send()
                .await
            {
                Ok(response) => {
                    // Reaching the server at all counts as success; the
                    // status is recorded but never retried on.
                    let status = response.status();
                    if status.is_success() {
                        debug!("Bulk accepted with status {}", status);
                    } else {
                        warn!("Bulk answered with non-success status {}", status);
                    }
                    return true;
                }
                Err(e) => {
                    error!(
                        "Failed to send bulk (attempt {}/{}): {}",
                        attempt, self.retry_count, e
                    );
                }
            }
        }

        error!(
            "Dropping bulk of {} entries after {} attempts",
            envelope.log_entries.len(),
            self.retry_count
        );
        false
    }

    /// Queries the server's current time in epoch milliseconds.
    ///
    /// The response body is a numeric tick string; its most significant 13
    /// digits are interpreted as milliseconds since the epoch.
    pub async fn fetch_server_time(&self) -> Result<f64, ShipError> {
        let mut slot = self.client.lock().await;
        let client = self.get_or_init(&mut slot)?;

        let response = client
            .get(&self.time_url)
            .send()
            .await
            .map_err(ShipError::Http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ShipError::TimeStatus(status));
        }

        let body = response.text().await.map_err(ShipError::Http)?;
        parse_server_ticks(&body)
    }

    fn encode(envelope: &BulkEnvelope) -> Result<Vec<u8>, ShipError> {
        serde_json::to_vec(envelope).map_err(ShipError::from)
    }

    fn get_or_init<'a>(
        &self,
        slot: &'a mut Option<reqwest::Client>,
    ) -> Result<&'a reqwest::Client, ShipError> {
        match slot {
            Some(client) => Ok(client),
            None => {
                let client = self.build_client()?;
                Ok(slot.insert(client))
            }
        }
    }

    fn build_client(&self) -> Result<reqwest::Client, ShipError> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .pool_idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .tcp_keepalive(Some(TCP_KEEPALIVE));

        // Proxy environment variables are honored unless explicitly
        // disabled.
        if self.disable_proxy {
            builder = builder.no_proxy();
        }

        builder.build().map_err(ShipError::ClientBuild)
    }
}

/// Extracts epoch milliseconds from a server tick string.
///
/// The body is the server's clock in sub-millisecond ticks; taking the 13
/// most significant digits yields milliseconds regardless of the tick
/// resolution. Bodies with fewer digits are used whole.
pub(crate) fn parse_server_ticks(body: &str) -> Result<f64, ShipError> {
    let digits: String = body
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return Err(ShipError::InvalidTicks(body.chars().take(64).collect()));
    }

    let millis = &digits[..digits.len().min(13)];
    millis
        .parse::<i64>()
        .map(|ms| ms as f64)
        .map_err(|_| ShipError::InvalidTicks(body.chars().take(64).collect()))
}
