//! Thread-safe accumulation and chunking of pending log records.
//!
//! The buffer is a FIFO of records protected by a single process-wide lock,
//! held only for the duration of an append or drain, never across network
//! I/O. Producer threads append; the scheduler (or an explicit flush)
//! drains from the front.
//!
//! # Size Accounting
//!
//! A running byte counter approximates the serialized size of the buffered
//! records. Each record's JSON-encoded length is computed once at append
//! time and cached next to it; array separators and envelope overhead are
//! ignored. The counter is a soft threshold: both ceilings it guards are
//! safety margins, not protocol limits, so exact accounting is
//! intentionally not attempted.
//!
//! # Overload Policy
//!
//! Once the estimate reaches the buffer ceiling, further appends are
//! dropped silently (backpressure by discard). Producers are never blocked
//! and never see an error.
//!
//! # Fork Safety
//!
//! The buffer records the process id that created it. If an append runs in
//! a different process (the host application forked), the inherited state
//! is reset before the append proceeds so the child does not ship or
//! corrupt the parent's queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::record::LogRecord;

/// A buffered record plus its cached encoded size.
#[derive(Debug)]
struct Entry {
    record: LogRecord,
    encoded_size: usize,
}

#[derive(Debug)]
struct BufferState {
    records: VecDeque<Entry>,
    byte_size: usize,
    owner_pid: u32,
}

/// Read-only view of the buffer, used by the scheduler to pick an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    /// Number of buffered records.
    pub len: usize,
    /// Approximate cumulative serialized size in bytes.
    pub byte_size: usize,
}

/// FIFO store of pending records with approximate byte accounting.
#[derive(Debug)]
pub struct RecordBuffer {
    max_buffer_size: usize,
    max_chunk_size: usize,
    inner: Mutex<BufferState>,
}

impl RecordBuffer {
    /// Creates an empty buffer owned by the current process.
    #[must_use]
    pub fn new(max_buffer_size: usize, max_chunk_size: usize) -> Self {
        RecordBuffer {
            max_buffer_size,
            max_chunk_size,
            inner: Mutex::new(BufferState {
                records: VecDeque::new(),
                byte_size: 0,
                owner_pid: std::process::id(),
            }),
        }
    }

    /// Appends a record, or drops it silently if the buffer is full.
    ///
    /// Performs the fork check first: if the stored owner pid differs from
    /// the current process id, the inherited state is cleared before the
    /// append. Never returns an error and never blocks beyond the lock.
    pub fn append(&self, record: LogRecord) {
        let mut state = self.lock();

        let pid = std::process::id();
        if state.owner_pid != pid {
            warn!(
                "Process identity changed ({} -> {}), resetting inherited log buffer",
                state.owner_pid, pid
            );
            state.records.clear();
            state.byte_size = 0;
            state.owner_pid = pid;
        }

        if state.byte_size >= self.max_buffer_size {
            // Ceiling reached: discard rather than block the producer.
            debug!(
                "Log buffer full ({} bytes), dropping new record",
                state.byte_size
            );
            return;
        }

        let encoded_size = match serde_json::to_vec(&record) {
            Ok(encoded) => encoded.len(),
            Err(e) => {
                warn!("Failed to estimate record size, using text length: {}", e);
                record.text.len()
            }
        };

        state.byte_size += encoded_size;
        state.records.push_back(Entry {
            record,
            encoded_size,
        });
    }

    /// Removes and returns the first `count` records in append order.
    ///
    /// The byte counter is decremented by the removed records' cached
    /// sizes, clamped at zero so estimation error never drives it negative.
    pub fn drain_prefix(&self, count: usize) -> Vec<LogRecord> {
        let mut state = self.lock();
        Self::drain_prefix_locked(&mut state, count)
    }

    /// Selects the chunk prefix length for the current contents.
    ///
    /// Starts from the full buffer length and repeatedly halves it until
    /// the estimated size of the prefix fits under the chunk ceiling. This
    /// is a deliberate coarse approximation, not a maximal-prefix search:
    /// it may under-fill chunks when the exact boundary lies between two
    /// halving steps. If halving reaches zero on a non-empty buffer, a
    /// single record is selected anyway so an oversized record is shipped
    /// alone rather than starved forever.
    #[must_use]
    pub fn chunk_prefix(&self) -> usize {
        let state = self.lock();
        Self::chunk_prefix_locked(&state, self.max_chunk_size)
    }

    /// Selects and drains one chunk under a single lock acquisition.
    ///
    /// Equivalent to `drain_prefix(chunk_prefix())` but immune to a
    /// competing drain shifting the prefix between the two calls.
    pub fn drain_chunk(&self) -> Vec<LogRecord> {
        let mut state = self.lock();
        let count = Self::chunk_prefix_locked(&state, self.max_chunk_size);
        Self::drain_prefix_locked(&mut state, count)
    }

    /// Current record count and byte estimate, without draining.
    #[must_use]
    pub fn snapshot(&self) -> BufferSnapshot {
        let state = self.lock();
        BufferSnapshot {
            len: state.records.len(),
            byte_size: state.byte_size,
        }
    }

    fn chunk_prefix_locked(state: &BufferState, max_chunk_size: usize) -> usize {
        let mut count = state.records.len();
        if count == 0 {
            return 0;
        }
        while count > 0 && Self::prefix_size(state, count) > max_chunk_size {
            count /= 2;
        }
        // A single oversized record is always shipped alone.
        count.max(1)
    }

    fn drain_prefix_locked(state: &mut BufferState, count: usize) -> Vec<LogRecord> {
        let mut drained = Vec::with_capacity(count.min(state.records.len()));
        for _ in 0..count {
            let Some(entry) = state.records.pop_front() else {
                break;
            };
            state.byte_size = state.byte_size.saturating_sub(entry.encoded_size);
            drained.push(entry.record);
        }
        if state.records.is_empty() {
            state.byte_size = 0;
        }
        drained
    }

    fn prefix_size(state: &BufferState, count: usize) -> usize {
        state
            .records
            .iter()
            .take(count)
            .map(|entry| entry.encoded_size)
            .sum()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // A poisoned lock means a panic mid-append or mid-drain; the state
        // is still structurally valid, and dropping telemetry is preferable
        // to crashing the host.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[cfg(test)]
    pub(crate) fn force_owner_pid(&self, pid: u32) {
        self.lock().owner_pid = pid;
    }
}
