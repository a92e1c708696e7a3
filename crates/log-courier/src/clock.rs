//! Clock-offset state and periodic resynchronization.
//!
//! The ingestion backend timestamps queries and the local host rarely agree
//! on wall-clock time. This module keeps a process-wide millisecond delta
//! (`server - local`) that the shipper adds to every newly appended
//! record's timestamp. Records already buffered keep their original stamp;
//! there is no retroactive correction.
//!
//! The offset is stored in atomics so the append hot path never blocks on
//! a sync in progress. Updates happen only on a successful exchange; any
//! network or parse failure leaves the previous offset untouched
//! (stale-but-valid policy).

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::ShipError;
use crate::sender::HttpSender;

/// Current local wall-clock time as fractional epoch milliseconds.
pub(crate) fn epoch_millis_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Current local wall-clock time as whole epoch milliseconds.
pub(crate) fn epoch_millis_i64() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Process-wide clock offset with resync gating.
#[derive(Debug)]
pub struct ClockSync {
    /// Bit pattern of the f64 delta in milliseconds.
    delta_bits: AtomicU64,
    /// Epoch milliseconds of the last successful sync; 0 means never.
    last_update_ms: AtomicI64,
    resync_interval: Duration,
}

impl ClockSync {
    /// Creates an unsynchronized clock (offset 0, first resync due
    /// immediately).
    #[must_use]
    pub fn new(resync_interval: Duration) -> Self {
        ClockSync {
            delta_bits: AtomicU64::new(0f64.to_bits()),
            last_update_ms: AtomicI64::new(0),
            resync_interval,
        }
    }

    /// The correction, in milliseconds, to add to local timestamps.
    #[must_use]
    pub fn offset_millis(&self) -> f64 {
        f64::from_bits(self.delta_bits.load(Ordering::Relaxed))
    }

    /// Whether enough time has passed since the last successful sync.
    #[must_use]
    pub fn is_due(&self, now_ms: i64) -> bool {
        let elapsed = now_ms.saturating_sub(self.last_update_ms.load(Ordering::Relaxed));
        elapsed >= i64::try_from(self.resync_interval.as_millis()).unwrap_or(i64::MAX)
    }

    /// Resynchronizes against the server if the interval has elapsed.
    ///
    /// Returns `Ok(true)` when the offset was refreshed, `Ok(false)` when
    /// no sync was due. On failure the previous offset (and its last-update
    /// stamp) are left untouched, so the next trigger retries.
    pub async fn maybe_resync(&self, sender: &HttpSender) -> Result<bool, ShipError> {
        if !self.is_due(epoch_millis_i64()) {
            return Ok(false);
        }

        let server_ms = sender.fetch_server_time().await?;
        let delta = server_ms - epoch_millis_f64();

        self.delta_bits.store(delta.to_bits(), Ordering::Relaxed);
        self.last_update_ms
            .store(epoch_millis_i64(), Ordering::Relaxed);
        debug!("Updated clock offset to {:.1} ms", delta);
        Ok(true)
    }

    #[cfg(test)]
    pub(crate) fn force_offset(&self, delta_ms: f64, last_update_ms: i64) {
        self.delta_bits
            .store(delta_ms.to_bits(), Ordering::Relaxed);
        self.last_update_ms
            .store(last_update_ms, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CourierConfig;

    fn test_sender(base_url: &str) -> HttpSender {
        let config = CourierConfig::new(base_url, "pk", "app", "sub");
        HttpSender::new(&config)
    }

    #[test]
    fn test_initial_offset_is_zero_and_due() {
        let clock = ClockSync::new(Duration::from_secs(300));

        assert_eq!(clock.offset_millis(), 0.0);
        assert!(clock.is_due(epoch_millis_i64()));
    }

    #[test]
    fn test_not_due_right_after_update() {
        let clock = ClockSync::new(Duration::from_secs(300));
        let now = epoch_millis_i64();
        clock.force_offset(1.0, now);

        assert!(!clock.is_due(now + 1_000));
        assert!(clock.is_due(now + 301_000));
    }

    #[tokio::test]
    async fn test_resync_updates_offset() {
        let mut server = mockito::Server::new_async().await;
        // Server reports local time plus two seconds, in 100 ns ticks; the
        // first 13 digits of the tick string are the epoch milliseconds.
        let server_ms = epoch_millis_i64() + 2_000;
        let mock = server
            .mock("GET", "/api/v1/logs")
            .with_status(200)
            .with_body(format!("{}0000", server_ms))
            .create_async()
            .await;

        let sender = test_sender(&server.url());
        let clock = ClockSync::new(Duration::from_secs(300));

        let updated = clock.maybe_resync(&sender).await.unwrap();

        assert!(updated);
        let offset = clock.offset_millis();
        assert!(
            (offset - 2_000.0).abs() < 1_000.0,
            "offset was {offset} ms"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resync_gating_one_network_call() {
        let mut server = mockito::Server::new_async().await;
        let server_ms = epoch_millis_i64();
        let mock = server
            .mock("GET", "/api/v1/logs")
            .with_status(200)
            .with_body(format!("{}0000", server_ms))
            .expect(1)
            .create_async()
            .await;

        let sender = test_sender(&server.url());
        let clock = ClockSync::new(Duration::from_secs(300));

        assert!(clock.maybe_resync(&sender).await.unwrap());
        // Second trigger inside the interval: no request goes out.
        assert!(!clock.maybe_resync(&sender).await.unwrap());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_previous_offset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/logs")
            .with_status(200)
            .with_body("not a number")
            .create_async()
            .await;

        let sender = test_sender(&server.url());
        let clock = ClockSync::new(Duration::from_secs(300));
        clock.force_offset(1_234.0, 0);

        let result = clock.maybe_resync(&sender).await;

        assert!(result.is_err());
        assert_eq!(clock.offset_millis(), 1_234.0);
        // Last-update stamp untouched, so the next trigger retries.
        assert!(clock.is_due(epoch_millis_i64()));
        mock.assert_async().await;
    }
}
