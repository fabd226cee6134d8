//! Reader stage - fills chunk buffers sequentially
//!
//! Runs on the coordinator's calling thread rather than a spawned worker.
//! For each block it acquires a recycled buffer from the free pool
//! (stalling there is the pipeline's backpressure), tags it with the
//! block index, fills it from the input, and submits it to the job queue.
//! After the last block it flips the pipeline into draining so the
//! hashers and writer can finish in-flight work and exit.

use crate::error::{Result, SignatureError};
use crate::io::BlockReader;
use crate::pipeline::coordinator::{PipelineFlags, PipelineStats};
use crate::pipeline::pool::ChunkBuffer;
use crate::pipeline::queue::BoundedQueue;
use tracing::{debug, trace};

/// Read every block of the input and submit it for hashing
///
/// Returns `Interrupted` when the abort flag is raised elsewhere, or a
/// `ReadFailed` (after raising the flag) when the input fails mid-run.
pub(crate) fn run_reader(
    input: &mut BlockReader,
    block_size: u64,
    free_chunks: &BoundedQueue<ChunkBuffer>,
    job_queue: &BoundedQueue<ChunkBuffer>,
    flags: &PipelineFlags,
    stats: &PipelineStats,
) -> Result<()> {
    let block_count = input.block_count(block_size);
    debug!(blocks = block_count, "Reader starting");

    for block_index in 0..block_count {
        if flags.is_aborted() {
            return Err(SignatureError::Interrupted);
        }

        let Some(mut chunk) = free_chunks.pop_blocking(|| flags.is_aborted()) else {
            return Err(SignatureError::Interrupted);
        };

        chunk.block_index = block_index;
        if let Err(source) = input.read_block(&mut chunk.data) {
            flags.abort();
            // The chunk goes back so the pool stays whole for join-time
            // accounting; the queue cannot be full by conservation.
            let _ = free_chunks.try_push(chunk);
            return Err(SignatureError::ReadFailed {
                block_index,
                source,
            });
        }

        if let Err(chunk) = job_queue.push_blocking(chunk, || !flags.is_aborted()) {
            let _ = free_chunks.try_push(chunk);
            return Err(SignatureError::Interrupted);
        }

        stats.record_read();
        trace!(block = block_index, "Block submitted");
    }

    flags.begin_drain();
    debug!(blocks = block_count, "Reader done, draining pipeline");
    Ok(())
}
