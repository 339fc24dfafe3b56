//! Full rebuild of the keyword index

use std::time::Instant;

use crate::error::Result;
use super::{IndexTask, SearchIndex};

/// Posts written per index transaction during a rebuild
const BATCH_SIZE: usize = 256;

/// Index every post yielded by `tasks` (in creation order)
///
/// `total` is only used for progress logging. The ready marker is left to
/// the pipeline.
pub fn rebuild<I>(index: &SearchIndex, total: usize, tasks: I) -> Result<u64>
where
    I: IntoIterator<Item = Result<IndexTask>>,
{
    let started = Instant::now();
    tracing::info!("Rebuilding search index from {} posts", total);

    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut done = 0u64;
    for task in tasks {
        batch.push(task?);
        if batch.len() == BATCH_SIZE {
            index.index_batch(&batch)?;
            done += batch.len() as u64;
            batch.clear();
            tracing::info!("Indexed {}/{} posts", done, total);
        }
    }
    if !batch.is_empty() {
        index.index_batch(&batch)?;
        done += batch.len() as u64;
    }

    tracing::info!(
        "Search index rebuilt: {} posts in {:.2?}",
        done,
        started.elapsed()
    );
    Ok(done)
}
