//! The append-only snapshot interface the engine writes to.
//!
//! At the start of every step the engine hands the full batch of
//! [`AgentSnapshot`]s to a [`SnapshotSink`] under its stream key. One call is
//! one atomic append: either the whole batch is stored or the call fails and
//! the engine leaves the step unexecuted.
//!
//! [`MemorySink`] keeps streams in process and is what tests and the census
//! tooling use; the Dragonfly-backed sink lives in the engine binary.

use std::collections::BTreeMap;

use contagion_types::AgentSnapshot;

/// Errors reported by a snapshot sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The storage backend failed.
    #[error("snapshot backend error: {source}")]
    Backend {
        /// The underlying backend error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The sink refused the append.
    #[error("append to stream `{stream_key}` rejected: {reason}")]
    Rejected {
        /// Stream the append targeted.
        stream_key: String,
        /// Why it was refused.
        reason: String,
    },
}

impl SinkError {
    /// Wrap a backend error.
    pub fn backend(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend {
            source: Box::new(source),
        }
    }
}

/// Destination for per-step snapshot batches.
pub trait SnapshotSink {
    /// Append `records` to the stream named `stream_key`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the batch could not be stored; nothing from
    /// the batch is visible in that case.
    fn append(&mut self, stream_key: &str, records: &[AgentSnapshot]) -> Result<(), SinkError>;
}

/// In-memory sink keyed by stream.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    streams: BTreeMap<String, Vec<AgentSnapshot>>,
    appends: u64,
}

impl MemorySink {
    /// Create an empty sink.
    pub const fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
            appends: 0,
        }
    }

    /// Every record appended to `stream_key`, in append order.
    pub fn records(&self, stream_key: &str) -> &[AgentSnapshot] {
        self.streams.get(stream_key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names of all streams written so far.
    pub fn stream_keys(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    /// Number of successful `append` calls.
    pub const fn append_count(&self) -> u64 {
        self.appends
    }

    /// Remove and return one stream.
    pub fn take(&mut self, stream_key: &str) -> Vec<AgentSnapshot> {
        self.streams.remove(stream_key).unwrap_or_default()
    }
}

impl SnapshotSink for MemorySink {
    fn append(&mut self, stream_key: &str, records: &[AgentSnapshot]) -> Result<(), SinkError> {
        self.streams
            .entry(stream_key.to_owned())
            .or_default()
            .extend_from_slice(records);
        self.appends = self.appends.saturating_add(1);
        Ok(())
    }
}
