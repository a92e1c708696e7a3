//! Internal error values for the shipping engine.
//!
//! Inner operations return these explicitly; they are swallowed and logged
//! only at the outermost boundaries (the scheduler cycle and the façade
//! surface), so no failure inside the engine ever reaches application code
//! as a panic or error.

use thiserror::Error;

/// Failure of one internal shipping operation.
#[derive(Debug, Error)]
pub enum ShipError {
    /// The HTTP client could not be constructed. Initialization is retried
    /// lazily on the next call.
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// A transport-level request failure (connect, timeout, TLS).
    #[error("http request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// An envelope or record could not be serialized; the affected send
    /// cycle is skipped.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The time endpoint answered with a non-success status.
    #[error("time endpoint returned status {0}")]
    TimeStatus(reqwest::StatusCode),

    /// The time endpoint returned a body with no usable tick value.
    #[error("time endpoint returned an unparseable body: {0:?}")]
    InvalidTicks(String),
}
