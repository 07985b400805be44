//! `Dragonfly` (Redis-compatible) stream and queue operations.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `<stream key>` | Stream | One entry per agent per step, e.g. `num_agents=200,width=800,...` |
//! | `<queue key>` | List | JSON-encoded run requests, consumed FIFO |
//!
//! Snapshot batches are written inside a single MULTI/EXEC transaction so a
//! reader never observes a partially written step.

use std::collections::HashMap;

use contagion_types::AgentSnapshot;
use fred::prelude::*;
use serde::Serialize;

use crate::error::DbError;
use crate::record::{decode_snapshot, encode_snapshot};

/// Entries fetched per XRANGE round trip when reading a stream back.
const READ_PAGE_SIZE: u64 = 10_000;

/// A stream entry as returned by XRANGE: id and field map.
type StreamEntry = (String, HashMap<String, String>);

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and provides typed operations for the
/// snapshot streams and the run queue.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Snapshot streams
    // =========================================================================

    /// Append one step's records to `stream_key`, atomically.
    ///
    /// Each record becomes one stream entry with an auto-generated id. All
    /// entries are queued in one MULTI/EXEC transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the transaction fails.
    pub async fn append_snapshots(
        &self,
        stream_key: &str,
        records: &[AgentSnapshot],
    ) -> Result<(), DbError> {
        if records.is_empty() {
            return Ok(());
        }
        let trx = self.client.multi();
        for record in records {
            let _: () = trx
                .xadd(stream_key, false, None, "*", encode_snapshot(record))
                .await?;
        }
        let ids: Vec<String> = trx.exec(true).await?;

        tracing::trace!(stream_key, entries = ids.len(), "Snapshot batch appended");
        Ok(())
    }

    /// Read every record of `stream_key`, oldest first.
    ///
    /// A missing stream reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if a read fails, or
    /// [`DbError::Decode`] if an entry is not a snapshot record.
    pub async fn read_stream(&self, stream_key: &str) -> Result<Vec<AgentSnapshot>, DbError> {
        let mut records = Vec::new();
        let mut start = String::from("-");

        loop {
            let page: Vec<StreamEntry> = self
                .client
                .xrange(stream_key, start.as_str(), "+", Some(READ_PAGE_SIZE))
                .await?;
            let full_page = u64::try_from(page.len()).is_ok_and(|n| n >= READ_PAGE_SIZE);

            let mut last_id = None;
            for (id, fields) in &page {
                records.push(decode_snapshot(id, fields)?);
                last_id = Some(id);
            }

            match last_id {
                Some(id) if full_page => start = format!("({id}"),
                _ => break,
            }
        }

        tracing::debug!(stream_key, records = records.len(), "Stream read");
        Ok(records)
    }

    /// Number of entries in `stream_key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn stream_len(&self, stream_key: &str) -> Result<u64, DbError> {
        let len: u64 = self.client.xlen(stream_key).await?;
        Ok(len)
    }

    /// Delete `stream_key` entirely.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete_stream(&self, stream_key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(stream_key).await?;
        Ok(())
    }

    // =========================================================================
    // Run queue
    // =========================================================================

    /// Serialize `item` as JSON and append it to the tail of `queue_key`.
    ///
    /// Returns the queue length after the push.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if serialization or the write fails.
    pub async fn enqueue_json<T: Serialize>(
        &self,
        queue_key: &str,
        item: &T,
    ) -> Result<u64, DbError> {
        let json = serde_json::to_string(item)?;
        let len: u64 = self.client.rpush(queue_key, json.as_str()).await?;
        Ok(len)
    }

    /// Pop the head of `queue_key`, waiting up to `timeout_secs`.
    ///
    /// Returns the entry's raw text, or `None` if the queue stayed empty for
    /// the whole timeout. A timeout of `0.0` blocks indefinitely. The entry
    /// is removed before the caller decodes it, so a payload that fails to
    /// decode is gone from the queue either way.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the pop fails.
    pub async fn dequeue(
        &self,
        queue_key: &str,
        timeout_secs: f64,
    ) -> Result<Option<String>, DbError> {
        let popped: Option<(String, String)> = self.client.blpop(queue_key, timeout_secs).await?;
        Ok(popped.map(|(_, payload)| payload))
    }

    /// Number of requests waiting in `queue_key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn queue_len(&self, queue_key: &str) -> Result<u64, DbError> {
        let len: u64 = self.client.llen(queue_key).await?;
        Ok(len)
    }

    /// Delete `queue_key` and everything waiting in it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn clear_queue(&self, queue_key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(queue_key).await?;
        Ok(())
    }
}
