//! The shipping context: append surface, scheduler loop, and lifecycle.
//!
//! A [`LogShipper`] owns the record buffer, the HTTP sender, the clock
//! offset, and the envelope template. It is explicitly constructed and
//! disposable, so tests can run several side by side; a process-wide
//! default instance is offered separately for ergonomic parity with
//! singleton-style logging setups.
//!
//! # Send Loop
//!
//! `start` spawns one long-lived background task that repeats:
//!
//! 1. Clock resync check (best-effort; failures are logged and ignored).
//! 2. Buffer snapshot; when empty, skip straight to the sleep.
//! 3. Carve one chunk, assemble the envelope, hand it to the sender.
//! 4. Sleep the fast interval while the buffer still holds more than half
//!    a chunk, the normal interval otherwise.
//!
//! The loop runs until `stop` cancels it; `stop` lets the current cycle
//! finish and joins the task. A caller-invoked [`LogShipper::flush`] runs
//! the same carve-and-send on the calling task, contending for the same
//! buffer and sender locks, and can therefore block for up to the full
//! retry budget of one send.
//!
//! No failure in any of this escapes to the caller: errors are routed to
//! the diagnostic sink and swallowed at this boundary.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::buffer::RecordBuffer;
use crate::clock::{epoch_millis_f64, ClockSync};
use crate::config::CourierConfig;
use crate::constants;
use crate::record::{BulkEnvelope, LogRecord, Severity};
use crate::sender::HttpSender;

/// Optional caller context attached to a record.
#[derive(Debug, Clone, Default)]
pub struct RecordMeta {
    pub class_name: String,
    pub method_name: String,
    /// Filled with the current thread's id when left empty.
    pub thread_id: String,
}

/// The fixed identity fields of every envelope, set once at construction.
#[derive(Debug, Clone)]
struct EnvelopeTemplate {
    private_key: String,
    application_name: String,
    subsystem_name: String,
    computer_name: String,
}

impl EnvelopeTemplate {
    fn from_config(config: &CourierConfig) -> Self {
        EnvelopeTemplate {
            private_key: config.private_key.clone(),
            application_name: config.application_name.clone(),
            subsystem_name: config.subsystem_name.clone(),
            computer_name: detect_computer_name(),
        }
    }

    fn envelope(&self, log_entries: Vec<LogRecord>) -> BulkEnvelope {
        BulkEnvelope {
            private_key: self.private_key.clone(),
            application_name: self.application_name.clone(),
            subsystem_name: self.subsystem_name.clone(),
            computer_name: self.computer_name.clone(),
            log_entries,
        }
    }
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Buffering, batching, and forwarding engine for one ingestion endpoint.
pub struct LogShipper {
    buffer: RecordBuffer,
    sender: HttpSender,
    clock: ClockSync,
    template: EnvelopeTemplate,
    max_chunk_size: usize,
    normal_interval: Duration,
    fast_interval: Duration,
    worker: tokio::sync::Mutex<Option<Worker>>,
}

impl LogShipper {
    /// Builds a shipper from a resolved configuration.
    ///
    /// Captures the computer name once and, unless disabled, appends a
    /// self-announcement record under the engine's own category so the
    /// backend sees the application come online.
    #[must_use]
    pub fn new(config: &CourierConfig) -> Arc<Self> {
        let shipper = Arc::new(LogShipper {
            buffer: RecordBuffer::new(config.max_buffer_size, config.max_chunk_size),
            sender: HttpSender::new(config),
            clock: ClockSync::new(config.resync_interval),
            template: EnvelopeTemplate::from_config(config),
            max_chunk_size: config.max_chunk_size,
            normal_interval: config.normal_interval,
            fast_interval: config.fast_interval,
            worker: tokio::sync::Mutex::new(None),
        });

        if config.announce_startup {
            let message = format!(
                "The application {} and subsystem {} (log-courier v{}) has started to send data",
                shipper.template.application_name,
                shipper.template.subsystem_name,
                env!("CARGO_PKG_VERSION"),
            );
            shipper.append_record(
                &message,
                Severity::Info,
                constants::COURIER_CATEGORY,
                RecordMeta::default(),
            );
        }

        shipper
    }

    /// Appends one normalized record to the buffer.
    ///
    /// Malformed input is defaulted, never rejected: a blank message
    /// becomes [`constants::EMPTY_MESSAGE`], a blank category becomes
    /// [`constants::COURIER_CATEGORY`], and a blank thread id is filled
    /// with the calling thread's id. The timestamp is stamped here as
    /// local epoch milliseconds plus the clock offset currently in effect.
    ///
    /// Non-blocking beyond the buffer lock; drops silently when the buffer
    /// is at capacity.
    pub fn append_record(
        &self,
        message: &str,
        severity: Severity,
        category: &str,
        meta: RecordMeta,
    ) {
        let text = if message.trim().is_empty() {
            constants::EMPTY_MESSAGE.to_string()
        } else {
            message.to_string()
        };
        let category = if category.trim().is_empty() {
            constants::COURIER_CATEGORY.to_string()
        } else {
            category.to_string()
        };
        let thread_id = if meta.thread_id.is_empty() {
            format!("{:?}", std::thread::current().id())
        } else {
            meta.thread_id
        };

        self.buffer.append(LogRecord {
            text,
            timestamp: epoch_millis_f64() + self.clock.offset_millis(),
            severity,
            category,
            class_name: meta.class_name,
            method_name: meta.method_name,
            thread_id,
        });
    }

    /// Carves one chunk and sends it on the calling task.
    ///
    /// Shares the buffer lock and the sender lock with the background
    /// loop, so this can block for the duration of a full HTTP retry
    /// sequence. It never returns an error; send failures are logged and
    /// the chunk is dropped.
    pub async fn flush(&self) {
        let chunk = self.buffer.drain_chunk();
        if chunk.is_empty() {
            return;
        }
        let envelope = self.template.envelope(chunk);
        self.sender.send(&envelope).await;
    }

    /// Spawns the background send loop. Idempotent; a second call while
    /// the loop is running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            warn!("Send loop already running, ignoring start");
            return;
        }

        let token = CancellationToken::new();
        let loop_token = token.clone();
        let shipper = Arc::clone(self);
        let handle = tokio::spawn(async move {
            shipper.run(loop_token).await;
        });

        *worker = Some(Worker { token, handle });
        debug!("Send loop started");
    }

    /// Signals the send loop to exit after its current cycle and joins it.
    ///
    /// Records still buffered are not flushed; call [`LogShipper::flush`]
    /// first when a final drain is wanted. Safe to call when the loop was
    /// never started.
    pub async fn stop(&self) {
        let worker = self.worker.lock().await.take();
        let Some(worker) = worker else {
            return;
        };

        worker.token.cancel();
        if let Err(e) = worker.handle.await {
            warn!("Send loop task failed to join: {}", e);
        }
        debug!("Send loop stopped");
    }

    async fn run(&self, token: CancellationToken) {
        loop {
            self.cycle().await;

            let interval = next_interval(
                self.buffer.snapshot().byte_size,
                self.max_chunk_size,
                self.fast_interval,
                self.normal_interval,
            );

            tokio::select! {
                () = token.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        debug!("Send loop exiting");
    }

    /// One scheduler cycle: resync check, then carve-and-send when the
    /// buffer is non-empty. All failures end here.
    async fn cycle(&self) {
        if let Err(e) = self.clock.maybe_resync(&self.sender).await {
            warn!("Clock sync failed, keeping previous offset: {}", e);
        }

        if self.buffer.snapshot().len == 0 {
            return;
        }
        self.flush().await;
    }

    /// Current record count and byte estimate of the buffer.
    #[must_use]
    pub fn snapshot(&self) -> crate::buffer::BufferSnapshot {
        self.buffer.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn clock(&self) -> &ClockSync {
        &self.clock
    }

    #[cfg(test)]
    pub(crate) fn buffer(&self) -> &RecordBuffer {
        &self.buffer
    }
}

/// Resolves the `computerName` stamped into every envelope, once per
/// shipper. A `COURIER_HOSTNAME` environment override wins over what the
/// kernel reports; when neither yields a usable name the envelopes carry a
/// fixed placeholder.
fn detect_computer_name() -> String {
    let override_name = std::env::var("COURIER_HOSTNAME")
        .ok()
        .filter(|name| !name.trim().is_empty());
    if let Some(name) = override_name {
        return name;
    }

    nix::unistd::gethostname()
        .ok()
        .and_then(|raw| raw.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            warn!("No usable hostname from the system, stamping placeholder");
            "unknown".to_string()
        })
}

/// Picks the next sleep: fast while the buffer holds more than half a
/// chunk, normal otherwise. There is no extra backoff after failed sends;
/// the cadence resumes immediately.
fn next_interval(
    byte_size: usize,
    max_chunk_size: usize,
    fast_interval: Duration,
    normal_interval: Duration,
) -> Duration {
    if byte_size > max_chunk_size / 2 {
        fast_interval
    } else {
        normal_interval
    }
}

static GLOBAL: OnceLock<Arc<LogShipper>> = OnceLock::new();

/// Initializes the process-wide default shipper.
///
/// The first call wins; later calls return the existing instance and
/// ignore their configuration. The caller still decides when to
/// [`LogShipper::start`] the loop.
pub fn init_global(config: &CourierConfig) -> Arc<LogShipper> {
    Arc::clone(GLOBAL.get_or_init(|| LogShipper::new(config)))
}

/// The process-wide default shipper, if one was initialized.
#[must_use]
pub fn global() -> Option<Arc<LogShipper>> {
    GLOBAL.get().map(Arc::clone)
}
