//! Asynchronous indexing pipeline
//!
//! ```text
//! writers ──submit──▶ bounded queue ──▶ worker thread ──▶ SearchIndex
//! ```
//!
//! Overflow policy: a submitter waits up to the enqueue timeout for room in
//! the queue, then drops the task.
//!
//! The index's ready marker is cleared (and synced) at start and set again
//! only by a shutdown with nothing dropped or failed. A crash, or any loss,
//! leaves it unset and the next start rebuilds the index.
//!
//! The worker is the only writer of the index. A full rebuild while running
//! goes through [`IndexPipeline::run_exclusive`], which holds the worker off.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{LarigotError, Result};
use super::{IndexTask, SearchIndex};

/// Statistics for the indexing pipeline
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Tasks accepted into the queue
    pub submitted: AtomicU64,

    /// Tasks written to the index
    pub indexed: AtomicU64,

    /// Tasks dropped because the queue stayed full or was closed
    pub dropped: AtomicU64,

    /// Tasks the index rejected
    pub failed: AtomicU64,

    /// Tasks accepted but not yet processed
    pub pending: AtomicU64,
}

impl PipelineStats {
    /// Number of updates the index is missing
    pub fn lost(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }
}

/// Bounded queue feeding exactly one indexing worker
pub struct IndexPipeline {
    /// `None` after shutdown
    sender: Mutex<Option<Sender<IndexTask>>>,

    worker: Mutex<Option<JoinHandle<()>>>,

    /// Held by the worker around each task and by `run_exclusive`
    gate: Arc<Mutex<()>>,

    index: Arc<SearchIndex>,

    /// How long `submit` waits on a full queue
    enqueue_timeout: Duration,

    stats: Arc<PipelineStats>,
}

impl IndexPipeline {
    /// Clear the ready marker and start the worker thread
    pub fn start(index: Arc<SearchIndex>, capacity: usize, enqueue_timeout: Duration) -> Result<Self> {
        index.set_ready(false)?;

        let (tx, rx) = bounded(capacity);
        let stats = Arc::new(PipelineStats::default());
        let gate = Arc::new(Mutex::new(()));

        let worker_index = Arc::clone(&index);
        let worker_stats = Arc::clone(&stats);
        let worker_gate = Arc::clone(&gate);
        let worker = thread::Builder::new()
            .name("larigot-indexer".to_string())
            .spawn(move || Self::worker_loop(rx, worker_index, worker_stats, worker_gate))?;

        tracing::debug!("Index pipeline started (capacity {})", capacity);

        Ok(Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            gate,
            index,
            enqueue_timeout,
            stats,
        })
    }

    /// Queue a task; returns false if it was dropped
    pub fn submit(&self, task: IndexTask) -> bool {
        let Some(sender) = self.sender.lock().clone() else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Index pipeline is shut down, dropped post {}", task.post_id);
            // Shutdown may already have set the marker.
            self.mark_stale();
            return false;
        };

        let post_id = task.post_id;
        self.stats.pending.fetch_add(1, Ordering::Relaxed);
        match sender.send_timeout(task, self.enqueue_timeout) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(SendTimeoutError::Timeout(_)) => {
                self.stats.pending.fetch_sub(1, Ordering::Relaxed);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Index queue full for {:?}, dropped post {}",
                    self.enqueue_timeout,
                    post_id
                );
                false
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                self.stats.pending.fetch_sub(1, Ordering::Relaxed);
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Index worker has stopped, dropped post {}", post_id);
                false
            }
        }
    }

    /// Get pipeline statistics
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Get number of pending tasks
    pub fn pending(&self) -> u64 {
        self.stats.pending.load(Ordering::Relaxed)
    }

    /// Wait until every accepted task has been processed
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
        true
    }

    /// Run `f` while the worker is held off the index
    ///
    /// Used for a full rebuild. Losses counted before `f` starts are
    /// forgiven if it succeeds.
    pub fn run_exclusive<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _gate = self.gate.lock();
        let dropped = self.stats.dropped.load(Ordering::Relaxed);
        let failed = self.stats.failed.load(Ordering::Relaxed);

        let out = f()?;

        self.stats.dropped.fetch_sub(dropped, Ordering::Relaxed);
        self.stats.failed.fetch_sub(failed, Ordering::Relaxed);
        Ok(out)
    }

    /// Stop accepting tasks, drain the queue and join the worker
    ///
    /// Sets the index's ready marker iff no update was lost. Idempotent.
    pub fn shutdown(&self) -> Result<()> {
        drop(self.sender.lock().take());
        if let Some(worker) = self.worker.lock().take() {
            worker
                .join()
                .map_err(|_| LarigotError::Search("index worker panicked".to_string()))?;
            tracing::debug!(
                "Index pipeline stopped ({} indexed)",
                self.stats.indexed.load(Ordering::Relaxed)
            );
        }

        let _gate = self.gate.lock();
        let lost = self.stats.lost();
        let ready = lost == 0;
        if self.index.is_ready()? != ready {
            if !ready {
                tracing::warn!(
                    "{} index updates were lost, index will be rebuilt at next start",
                    lost
                );
            }
            self.index.set_ready(ready)?;
        }
        Ok(())
    }

    /// Clear the ready marker after a loss, logging instead of failing
    fn mark_stale(&self) {
        let _gate = self.gate.lock();
        let result = self
            .index
            .is_ready()
            .and_then(|ready| if ready { self.index.set_ready(false) } else { Ok(()) });
        if let Err(e) = result {
            tracing::error!("Failed to clear search index ready marker: {}", e);
        }
    }

    fn worker_loop(
        rx: Receiver<IndexTask>,
        index: Arc<SearchIndex>,
        stats: Arc<PipelineStats>,
        gate: Arc<Mutex<()>>,
    ) {
        for task in rx.iter() {
            let result = {
                let _gate = gate.lock();
                index.index(&task)
            };
            match result {
                Ok(()) => {
                    stats.indexed.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!("Indexed post {}", task.post_id);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("Failed to index post {}: {}", task.post_id, e);
                }
            }
            stats.pending.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Drop for IndexPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Index pipeline shutdown failed: {}", e);
        }
    }
}
