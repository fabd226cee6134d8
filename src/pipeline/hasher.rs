//! Hasher stage - parallel CRC32 workers
//!
//! Each worker pulls tagged chunks from the job queue, computes the
//! block's CRC32, emits a result record, and recycles the chunk (zeroed,
//! index reset) back to the free pool. Workers never coordinate with each
//! other; results may reach the writer out of block order, which the
//! positional output layout absorbs.

use crate::checksum::crc32;
use crate::error::{Result, SignatureError, WorkerError};
use crate::pipeline::coordinator::{PipelineFlags, PipelineStats};
use crate::pipeline::pool::{ChunkBuffer, ResultRecord};
use crate::pipeline::queue::BoundedQueue;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// A hash worker thread
pub(crate) struct HashWorker {
    id: usize,
    handle: Option<JoinHandle<Result<()>>>,
}

impl HashWorker {
    /// Spawn a named hasher thread
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        id: usize,
        job_queue: Arc<BoundedQueue<ChunkBuffer>>,
        free_chunks: Arc<BoundedQueue<ChunkBuffer>>,
        free_results: Arc<BoundedQueue<ResultRecord>>,
        result_queue: Arc<BoundedQueue<ResultRecord>>,
        flags: Arc<PipelineFlags>,
        stats: Arc<PipelineStats>,
    ) -> std::result::Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name(format!("sig-hash-{}", id))
            .spawn(move || {
                hash_loop(
                    id,
                    &job_queue,
                    &free_chunks,
                    &free_results,
                    &result_queue,
                    &flags,
                    &stats,
                )
            })
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Wait for the worker to finish
    ///
    /// A panicked thread leaves no error of its own to surface, so it
    /// maps to the catch-all "Unknown error" diagnostic.
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => {
                    warn!(worker = self.id, "Hasher thread panicked");
                    Err(SignatureError::Unknown)
                }
            },
            None => Ok(()),
        }
    }
}

/// Main hasher loop
///
/// Exits when the job queue is empty and the pipeline is draining, or
/// when the abort flag is raised.
fn hash_loop(
    id: usize,
    job_queue: &BoundedQueue<ChunkBuffer>,
    free_chunks: &BoundedQueue<ChunkBuffer>,
    free_results: &BoundedQueue<ResultRecord>,
    result_queue: &BoundedQueue<ResultRecord>,
    flags: &PipelineFlags,
    stats: &PipelineStats,
) -> Result<()> {
    debug!(worker = id, "Hasher starting");
    let mut hashed = 0u64;

    loop {
        let Some(mut chunk) =
            job_queue.pop_blocking(|| flags.draining() || flags.is_aborted())
        else {
            break;
        };

        if flags.is_aborted() {
            let _ = free_chunks.try_push(chunk);
            break;
        }

        let Some(mut record) = free_results.pop_blocking(|| flags.is_aborted()) else {
            // Aborted while waiting for a record slot.
            let _ = free_chunks.try_push(chunk);
            break;
        };

        record.block_index = chunk.block_index;
        record.crc = crc32(&chunk.data);

        if let Err(record) = result_queue.push_blocking(record, || !flags.is_aborted()) {
            let _ = free_results.try_push(record);
            let _ = free_chunks.try_push(chunk);
            break;
        }

        chunk.reset();
        // Conservation: the free queue always has room for its own pool.
        let _ = free_chunks.try_push(chunk);

        hashed += 1;
        stats.record_hashed();
    }

    debug!(worker = id, blocks = hashed, "Hasher shutting down");
    Ok(())
}
