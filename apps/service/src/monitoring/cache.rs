//! Per-check result buffering.
//!
//! Each completed tick appends one [`TickBatch`] to its check's buffer. When a
//! buffer holds `threshold` batches the whole buffer is taken in one step,
//! expanded into flat rows and written to the result store in one call.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::types::TickBatch;
use crate::database::ResultStore;
use crate::database::models::CheckLogRow;

/// What happens to a taken buffer when the write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// The buffer is cleared before writing; a failed write loses the rows
    #[default]
    ClearThenWrite,
    /// A failed write puts the batches back so the next flush retries them
    WriteThenClear,
}

impl fmt::Display for FlushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushPolicy::ClearThenWrite => write!(f, "clear_then_write"),
            FlushPolicy::WriteThenClear => write!(f, "write_then_clear"),
        }
    }
}

/// In-memory buffer of pending batches, keyed by check
pub trait ResultCache: Send + Sync {
    /// Append a batch; returns the check's pending count afterwards
    fn append(&self, check_id: Uuid, batch: TickBatch) -> usize;

    /// Take the whole buffer if it reached the threshold, leaving it empty
    fn take_ready(&self, check_id: Uuid) -> Option<Vec<TickBatch>>;

    /// Put batches back in front of anything appended since they were taken
    fn restore(&self, check_id: Uuid, batches: Vec<TickBatch>);

    /// Take every non-empty buffer regardless of threshold
    fn drain_all(&self) -> Vec<(Uuid, Vec<TickBatch>)>;

    /// Remove the buffers of checks not in `live`, returning the non-empty ones
    fn drain_stale(&self, live: &HashSet<Uuid>) -> Vec<(Uuid, Vec<TickBatch>)>;

    fn pending(&self, check_id: Uuid) -> usize;
}

pub struct InMemoryResultCache {
    threshold: usize,
    buffers: Mutex<HashMap<Uuid, Vec<TickBatch>>>,
}

impl InMemoryResultCache {
    pub fn new(threshold: usize) -> Self {
        Self { threshold: threshold.max(1), buffers: Mutex::new(HashMap::new()) }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    fn buffers(&self) -> MutexGuard<'_, HashMap<Uuid, Vec<TickBatch>>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultCache for InMemoryResultCache {
    fn append(&self, check_id: Uuid, batch: TickBatch) -> usize {
        let mut buffers = self.buffers();
        let buffer = buffers.entry(check_id).or_default();
        buffer.push(batch);
        buffer.len()
    }

    fn take_ready(&self, check_id: Uuid) -> Option<Vec<TickBatch>> {
        let mut buffers = self.buffers();
        let buffer = buffers.get_mut(&check_id)?;
        if buffer.len() < self.threshold {
            return None;
        }
        Some(std::mem::take(buffer))
    }

    fn restore(&self, check_id: Uuid, mut batches: Vec<TickBatch>) {
        let mut buffers = self.buffers();
        let buffer = buffers.entry(check_id).or_default();
        batches.append(buffer);
        *buffer = batches;
    }

    fn drain_all(&self) -> Vec<(Uuid, Vec<TickBatch>)> {
        self.buffers()
            .iter_mut()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(check_id, buffer)| (*check_id, std::mem::take(buffer)))
            .collect()
    }

    fn drain_stale(&self, live: &HashSet<Uuid>) -> Vec<(Uuid, Vec<TickBatch>)> {
        let mut buffers = self.buffers();
        let stale: Vec<Uuid> = buffers.keys().filter(|id| !live.contains(id)).copied().collect();

        stale
            .into_iter()
            .filter_map(|check_id| buffers.remove(&check_id).map(|buffer| (check_id, buffer)))
            .filter(|(_, buffer)| !buffer.is_empty())
            .collect()
    }

    fn pending(&self, check_id: Uuid) -> usize {
        self.buffers().get(&check_id).map_or(0, Vec::len)
    }
}

/// Expand buffered batches into flat log rows
pub fn expand_rows(check_id: Uuid, batches: &[TickBatch]) -> Vec<CheckLogRow> {
    batches.iter().flat_map(|batch| batch.to_rows(check_id)).collect()
}

/// Result of a flush attempt for one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Below the threshold, nothing taken
    NotReady,
    Written(usize),
    /// The write failed and the rows are gone
    Lost(usize),
    /// The write failed and the batches went back into the buffer
    Retained(usize),
}

/// Moves buffered batches from the cache into the result store
pub struct BatchWriter {
    cache: Arc<dyn ResultCache>,
    store: Arc<dyn ResultStore>,
    policy: FlushPolicy,
}

impl BatchWriter {
    pub fn new(cache: Arc<dyn ResultCache>, store: Arc<dyn ResultStore>, policy: FlushPolicy) -> Self {
        Self { cache, store, policy }
    }

    pub fn append(&self, check_id: Uuid, batch: TickBatch) -> usize {
        self.cache.append(check_id, batch)
    }

    /// Flush the check's buffer if it reached the threshold
    pub async fn maybe_flush(&self, check_id: Uuid) -> FlushOutcome {
        match self.cache.take_ready(check_id) {
            Some(batches) => self.write(check_id, batches).await,
            None => FlushOutcome::NotReady,
        }
    }

    /// Flush every pending buffer, used on shutdown
    pub async fn flush_all(&self) -> Vec<(Uuid, FlushOutcome)> {
        self.write_drained(self.cache.drain_all()).await
    }

    /// Flush and forget the buffers of checks that are no longer scheduled
    pub async fn flush_stale(&self, live: &HashSet<Uuid>) -> Vec<(Uuid, FlushOutcome)> {
        self.write_drained(self.cache.drain_stale(live)).await
    }

    async fn write_drained(&self, drained: Vec<(Uuid, Vec<TickBatch>)>) -> Vec<(Uuid, FlushOutcome)> {
        let mut outcomes = Vec::new();
        for (check_id, batches) in drained {
            let outcome = self.write(check_id, batches).await;
            outcomes.push((check_id, outcome));
        }
        outcomes
    }

    async fn write(&self, check_id: Uuid, batches: Vec<TickBatch>) -> FlushOutcome {
        let rows = expand_rows(check_id, &batches);

        match self.store.write_batch(&rows).await {
            Ok(written) => {
                debug!(%check_id, batches = batches.len(), rows = written, "Flushed results");
                FlushOutcome::Written(written)
            }
            Err(e) => match self.policy {
                FlushPolicy::ClearThenWrite => {
                    error!(%check_id, rows = rows.len(), "Failed to persist results, dropping them: {e:#}");
                    FlushOutcome::Lost(rows.len())
                }
                FlushPolicy::WriteThenClear => {
                    warn!(%check_id, rows = rows.len(), "Failed to persist results, keeping them for the next flush: {e:#}");
                    self.cache.restore(check_id, batches);
                    FlushOutcome::Retained(rows.len())
                }
            },
        }
    }
}
