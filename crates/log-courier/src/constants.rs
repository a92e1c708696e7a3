//! Fixed limits and defaults for the shipping engine.
//!
//! These values bound memory usage and outbound request size, and set the
//! cadence of the background send loop. Both size ceilings are safety
//! margins enforced against *approximate* serialized sizes, not protocol
//! limits; see [`crate::buffer`] for the accounting rules.

use std::time::Duration;

/// Maximum total estimated bytes held in the buffer before new records are
/// dropped.
///
/// # Value: 12 MiB
///
/// Once the running estimate reaches this ceiling, `append` becomes a no-op
/// (backpressure by discard). The counter is an approximation of serialized
/// size, so the real memory footprint may differ slightly in either
/// direction.
pub const MAX_LOG_BUFFER_SIZE: usize = 12 * 1_024 * 1_024;

/// Maximum estimated bytes allowed in a single outbound chunk.
///
/// # Value: 1.5 MiB
///
/// The chunk builder selects a record prefix whose estimated serialized
/// size stays under this ceiling, except for a single oversized record
/// which is always shipped alone rather than starved forever.
pub const MAX_LOG_CHUNK_SIZE: usize = 3 * 512 * 1_024;

/// Send-loop sleep interval while buffer pressure is low.
pub const NORMAL_SEND_SPEED_INTERVAL: Duration = Duration::from_millis(500);

/// Send-loop sleep interval once the buffer holds more than half a chunk.
pub const FAST_SEND_SPEED_INTERVAL: Duration = Duration::from_millis(100);

/// Connect/read timeout for the HTTP client.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of attempts for one logical send before the chunk is dropped.
pub const HTTP_SEND_RETRY_COUNT: usize = 5;

/// Fixed delay between failed send attempts.
pub const HTTP_SEND_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Minimum time between two clock synchronization requests.
pub const SYNC_TIME_UPDATE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Path appended to the configured base URL for the log intake endpoint.
///
/// The time endpoint uses the same path; its GET response body carries the
/// server's current time in epoch ticks.
pub const LOGS_PATH: &str = "/api/v1/logs";

/// Sentinel credential stored when no private key was supplied.
pub const FAILED_PRIVATE_KEY: &str = "9626c7dd-8174-5015-a3fe-5572e042b6d9";

/// Fallback application name.
pub const NO_APP_NAME: &str = "NO_APP_NAME";

/// Fallback subsystem name.
pub const NO_SUB_SYSTEM: &str = "NO_SUB_NAME";

/// Replacement text stored for a nil or blank log message.
pub const EMPTY_MESSAGE: &str = "EMPTY_STRING";

/// Category assigned to records whose category is blank, and to the
/// engine's own self-announcement record.
pub const COURIER_CATEGORY: &str = "COURIER";
