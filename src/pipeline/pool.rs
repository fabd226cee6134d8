//! Pre-allocated buffer pools for the signature pipeline
//!
//! All block memory is allocated up front: `pool_size` chunk buffers of
//! `block_size` bytes and `pool_size` result records, each recycled
//! through a free queue for the lifetime of the run. Peak memory for
//! block data is therefore fixed by the pool, independent of input size,
//! and the free queues double as the pipeline's backpressure: a reader or
//! hasher that cannot acquire from its pool stalls until a downstream
//! stage recycles.

use crate::pipeline::queue::BoundedQueue;
use std::sync::Arc;

/// One block of input in flight, tagged with its position
///
/// Exclusively owned by whichever stage holds it; ownership moves through
/// the queues. Cleared (data zeroed, index reset) before each reuse so a
/// recycled buffer carries no residue into the next block's padding.
pub struct ChunkBuffer {
    /// Zero-based index of the block currently held
    pub block_index: u64,

    /// Block payload, always exactly `block_size` bytes
    pub data: Box<[u8]>,
}

impl ChunkBuffer {
    /// Allocate a zeroed buffer of `block_size` bytes
    pub fn new(block_size: usize) -> Self {
        Self {
            block_index: 0,
            data: vec![0u8; block_size].into_boxed_slice(),
        }
    }

    /// Clear contents and index before returning to the free pool
    pub fn reset(&mut self) {
        self.block_index = 0;
        self.data.fill(0);
    }
}

/// A hashed block: its position and CRC
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub block_index: u64,
    pub crc: u32,
}

impl ResultRecord {
    pub fn reset(&mut self) {
        self.block_index = 0;
        self.crc = 0;
    }
}

/// The two free pools feeding the pipeline
///
/// Invariant: chunks across {free_chunks, job queue, stage-local} always
/// sum to `size`; likewise for results. Nothing is allocated or freed
/// while workers run.
pub struct BufferPool {
    free_chunks: Arc<BoundedQueue<ChunkBuffer>>,
    free_results: Arc<BoundedQueue<ResultRecord>>,
    size: usize,
}

impl BufferPool {
    /// Allocate `pool_size` chunk buffers and result records
    pub fn new(pool_size: usize, block_size: usize) -> Self {
        let free_chunks = Arc::new(BoundedQueue::new(pool_size));
        let free_results = Arc::new(BoundedQueue::new(pool_size));

        for _ in 0..pool_size {
            // Cannot fail: the queues are sized to hold the whole pool.
            let _ = free_chunks.try_push(ChunkBuffer::new(block_size));
            let _ = free_results.try_push(ResultRecord::default());
        }

        Self {
            free_chunks,
            free_results,
            size: pool_size,
        }
    }

    pub fn free_chunks(&self) -> Arc<BoundedQueue<ChunkBuffer>> {
        Arc::clone(&self.free_chunks)
    }

    pub fn free_results(&self) -> Arc<BoundedQueue<ResultRecord>> {
        Arc::clone(&self.free_results)
    }

    /// Total entries per pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Wake any stage blocked on either free queue
    pub fn wake_all(&self) {
        self.free_chunks.wake_all();
        self.free_results.wake_all();
    }
}
