//! # log-courier
//!
//! A client-side telemetry shipping engine: application code hands in
//! structured log records, the engine buffers them, batches them under
//! strict size ceilings, and forwards them to a remote ingestion endpoint
//! over HTTP while compensating for clock drift against the server.
//!
//! ## Pipeline
//!
//! ```text
//!   Producer threads
//!        │ append_record (lock-bounded, never blocks on I/O)
//!        v
//!   ┌──────────────┐
//!   │ RecordBuffer │  (FIFO, 12 MiB ceiling, drop on overflow)
//!   └──────┬───────┘
//!          │ chunk prefix (≤ 1.5 MiB, halving search)
//!          v
//!   ┌──────────────┐
//!   │  HttpSender  │  (5 attempts × 2 s, one in flight process-wide)
//!   └──────┬───────┘
//!          │
//!          v
//!     Ingestion API
//! ```
//!
//! A background loop ([`LogShipper::start`]) drives the pipeline on an
//! adaptive cadence and keeps the clock offset fresh; [`LogShipper::flush`]
//! runs one carve-and-send synchronously on the caller's task.
//!
//! ## Delivery Guarantees
//!
//! None, on purpose. Overflowing records are dropped, exhausted retries
//! drop the chunk, and state is memory-only. The contract is that logging
//! never crashes or blocks the host application, at the cost of possible
//! silent telemetry loss.
//!
//! ## Example
//!
//! ```rust,ignore
//! use log_courier::{CourierConfig, LogShipper, RecordMeta, Severity};
//!
//! let config = CourierConfig::new("https://ingress.example.com", "key", "orders", "checkout");
//! let shipper = LogShipper::new(&config);
//! shipper.start().await;
//!
//! shipper.append_record("order placed", Severity::Info, "orders", RecordMeta::default());
//!
//! // At shutdown: final drain, then stop the loop.
//! shipper.flush().await;
//! shipper.stop().await;
//! ```

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unreachable_pub)]

/// Thread-safe record buffering and chunk selection
pub mod buffer;

/// Clock-offset state and periodic resynchronization
pub mod clock;

/// Resolved configuration consumed by the engine
pub mod config;

/// Fixed limits, cadences, and fallback strings
pub mod constants;

/// Internal error values
pub mod error;

/// Log record, severity, and bulk envelope wire model
pub mod record;

/// HTTP sender with bounded retries and time queries
pub mod sender;

/// The shipping context object and its background loop
pub mod shipper;

pub use buffer::BufferSnapshot;
pub use config::CourierConfig;
pub use error::ShipError;
pub use record::{BulkEnvelope, LogRecord, Severity};
pub use shipper::{global, init_global, LogShipper, RecordMeta};
