//! Snapshot sink that appends to a `Dragonfly` stream.
//!
//! The engine steps synchronously, so this sink must run on a blocking
//! thread (inside [`tokio::task::spawn_blocking`]); each append blocks that
//! thread on the async MULTI/EXEC write through a runtime [`Handle`].

use contagion_core::{SinkError, SnapshotSink};
use contagion_db::DragonflyPool;
use contagion_types::AgentSnapshot;
use tokio::runtime::Handle;
use tracing::trace;

/// [`SnapshotSink`] backed by [`DragonflyPool::append_snapshots`].
pub struct StreamSink {
    pool: DragonflyPool,
    handle: Handle,
    appended: u64,
}

impl StreamSink {
    /// Create a sink writing through `pool` on the runtime behind `handle`.
    pub const fn new(pool: DragonflyPool, handle: Handle) -> Self {
        Self {
            pool,
            handle,
            appended: 0,
        }
    }

    /// Records appended so far.
    pub const fn appended(&self) -> u64 {
        self.appended
    }
}

impl SnapshotSink for StreamSink {
    fn append(&mut self, stream_key: &str, records: &[AgentSnapshot]) -> Result<(), SinkError> {
        self.handle
            .block_on(self.pool.append_snapshots(stream_key, records))
            .map_err(SinkError::backend)?;
        let batch = u64::try_from(records.len()).unwrap_or(u64::MAX);
        self.appended = self.appended.saturating_add(batch);
        trace!(stream_key, batch, total = self.appended, "Batch stored");
        Ok(())
    }
}
