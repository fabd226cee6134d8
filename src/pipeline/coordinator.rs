//! Pipeline coordinator - owns pools, queues, workers, and shutdown
//!
//! The coordinator wires the four queues together, spawns the hashers and
//! the writer, and runs the reader loop on the calling thread:
//!
//! ```text
//! Reader ──▶ job_queue ──▶ Hashers ──▶ result_queue ──▶ Writer
//!    ▲                        │ ▲                          │
//!    └───── free_chunks ◀─────┘ └────── free_results ◀─────┘
//! ```
//!
//! Lifecycle: `running` (reader active) → `draining` (reader done,
//! workers finish in-flight blocks) → `joined`, with `aborting` reachable
//! from anywhere via the abort flag. Flags are monotonic; abort is
//! observed by every worker within one bounded-wait tick.

use crate::config::SigConfig;
use crate::error::{Result, SignatureError};
use crate::io::BlockReader;
use crate::pipeline::hasher::HashWorker;
use crate::pipeline::pool::{BufferPool, ChunkBuffer, ResultRecord};
use crate::pipeline::queue::BoundedQueue;
use crate::pipeline::reader::run_reader;
use crate::pipeline::writer::WriteWorker;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shutdown and failure flags shared by every stage
///
/// Both flags are monotonic: once raised they stay raised.
#[derive(Debug, Default)]
pub struct PipelineFlags {
    /// Reader has submitted the last block; workers drain and exit
    prepare_to_exit: AtomicBool,

    /// Unrecoverable failure (or interrupt); workers abandon work and exit
    aborted: AtomicBool,
}

impl PipelineFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the draining state. Release pairs with the Acquire in
    /// [`PipelineFlags::draining`] so a worker that observes the flag also
    /// observes every block submission that preceded it.
    pub fn begin_drain(&self) {
        self.prepare_to_exit.store(true, Ordering::Release);
    }

    pub fn draining(&self) -> bool {
        self.prepare_to_exit.load(Ordering::Acquire)
    }

    /// Raise the abort flag. Advisory: visibility within one wait tick is
    /// all the pipeline needs.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }
}

/// Counters shared between the stages and the progress reporter
#[derive(Debug, Default)]
pub struct PipelineStats {
    total_blocks: AtomicU64,
    blocks_read: AtomicU64,
    blocks_hashed: AtomicU64,
    blocks_written: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_total_blocks(&self, total: u64) {
        self.total_blocks.store(total, Ordering::Relaxed);
    }

    pub(crate) fn record_read(&self) {
        self.blocks_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hashed(&self) {
        self.blocks_hashed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self) {
        self.blocks_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_blocks.load(Ordering::Relaxed)
    }

    pub fn blocks_read(&self) -> u64 {
        self.blocks_read.load(Ordering::Relaxed)
    }

    pub fn blocks_hashed(&self) -> u64 {
        self.blocks_hashed.load(Ordering::Relaxed)
    }

    pub fn blocks_written(&self) -> u64 {
        self.blocks_written.load(Ordering::Relaxed)
    }
}

/// Result of a completed signature run
#[derive(Debug)]
pub struct SignatureSummary {
    /// Blocks hashed and written
    pub blocks: u64,

    /// Input size in bytes
    pub bytes: u64,

    /// Block size used
    pub block_size: u64,

    /// Wall time for the run
    pub duration: Duration,
}

/// Coordinates the signature pipeline
pub struct Coordinator {
    config: Arc<SigConfig>,
    flags: Arc<PipelineFlags>,
    stats: Arc<PipelineStats>,
}

impl Coordinator {
    /// Create a coordinator for a validated configuration
    pub fn new(config: SigConfig) -> Self {
        Self {
            config: Arc::new(config),
            flags: Arc::new(PipelineFlags::new()),
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Shared flags, for signal handlers and tests to raise an abort
    pub fn flags(&self) -> Arc<PipelineFlags> {
        Arc::clone(&self.flags)
    }

    /// Shared counters, for progress reporting
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Run the pipeline to completion
    ///
    /// Spawns `worker_count` hashers and one writer, runs the reader on
    /// this thread, then joins everything and surfaces the first failure.
    pub fn run(self) -> Result<SignatureSummary> {
        let start = Instant::now();
        let config = &self.config;

        let mut input = BlockReader::open(&config.input_path)?;
        let file_size = input.file_size();
        let block_count = input.block_count(config.block_size);
        self.stats.set_total_blocks(block_count);

        let pool_size = config.pool_size();
        let pool = BufferPool::new(pool_size, config.block_size as usize);
        let job_queue: Arc<BoundedQueue<ChunkBuffer>> = Arc::new(BoundedQueue::new(pool_size));
        let result_queue: Arc<BoundedQueue<ResultRecord>> =
            Arc::new(BoundedQueue::new(pool_size));

        info!(
            input = %config.input_path.display(),
            output = %config.output_path.display(),
            file_size,
            block_size = config.block_size,
            blocks = block_count,
            workers = config.worker_count,
            "Starting signature pipeline"
        );

        let writer = WriteWorker::spawn(
            config.output_path.clone(),
            Arc::clone(&result_queue),
            pool.free_results(),
            Arc::clone(&self.flags),
            Arc::clone(&self.stats),
        )?;

        let mut hashers = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            match HashWorker::spawn(
                id,
                Arc::clone(&job_queue),
                pool.free_chunks(),
                pool.free_results(),
                Arc::clone(&result_queue),
                Arc::clone(&self.flags),
                Arc::clone(&self.stats),
            ) {
                Ok(worker) => hashers.push(worker),
                Err(e) => {
                    // Tear down whatever already started before bailing.
                    self.flags.abort();
                    self.wake_everything(&pool, &job_queue, &result_queue);
                    self.join_all(hashers, writer);
                    return Err(e.into());
                }
            }
        }

        // The reader runs here, on the coordinator's thread.
        let reader_result = run_reader(
            &mut input,
            config.block_size,
            &pool.free_chunks(),
            &job_queue,
            &self.flags,
            &self.stats,
        );

        // The reader flipped the drain flag on success; on failure it
        // raised the abort flag itself. Either way, wake every waiter so
        // the flag is seen now rather than at the next tick.
        if reader_result.is_err() {
            self.flags.abort();
        }
        self.wake_everything(&pool, &job_queue, &result_queue);

        let mut first_error = reader_result.err();
        if let Some(e) = self.join_all(hashers, writer) {
            first_error = Some(prefer_concrete(first_error, e));
        }

        if let Some(e) = first_error {
            warn!(error = %e, "Signature pipeline failed");
            return Err(e);
        }

        // Aborted externally (e.g. Ctrl-C) without any worker reporting
        // a concrete failure.
        if self.flags.is_aborted() {
            return Err(SignatureError::Interrupted);
        }

        let duration = start.elapsed();
        info!(
            blocks = block_count,
            duration_ms = duration.as_millis() as u64,
            "Signature pipeline complete"
        );

        Ok(SignatureSummary {
            blocks: block_count,
            bytes: file_size,
            block_size: config.block_size,
            duration,
        })
    }

    /// Wake every blocked worker so flag changes are seen immediately
    fn wake_everything(
        &self,
        pool: &BufferPool,
        job_queue: &BoundedQueue<ChunkBuffer>,
        result_queue: &BoundedQueue<ResultRecord>,
    ) {
        pool.wake_all();
        job_queue.wake_all();
        result_queue.wake_all();
    }

    /// Join all workers, returning the first error observed in join order
    fn join_all(&self, hashers: Vec<HashWorker>, writer: WriteWorker) -> Option<SignatureError> {
        let mut first_error = None;

        for worker in hashers {
            if let Err(e) = worker.join() {
                self.flags.abort();
                first_error = Some(prefer_concrete(first_error.take(), e));
            }
        }

        if let Err(e) = writer.join() {
            self.flags.abort();
            first_error = Some(prefer_concrete(first_error.take(), e));
        }

        first_error
    }
}

/// Keep the most diagnosable error: a concrete failure always beats the
/// derived `Interrupted` that other workers report once the flag is up.
fn prefer_concrete(
    current: Option<SignatureError>,
    new: SignatureError,
) -> SignatureError {
    match current {
        None => new,
        Some(SignatureError::Interrupted)
            if !matches!(new, SignatureError::Interrupted) => new,
        Some(existing) => existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigConfig;
    use std::fs;
    use tempfile::tempdir;

    fn config_for(input: &std::path::Path, output: &std::path::Path) -> SigConfig {
        SigConfig {
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            block_size: 1024,
            worker_count: 4,
            show_progress: false,
            verbose: false,
        }
    }

    #[test]
    fn test_flags_are_monotonic() {
        let flags = PipelineFlags::new();
        assert!(!flags.draining());
        assert!(!flags.is_aborted());

        flags.begin_drain();
        flags.abort();
        assert!(flags.draining());
        assert!(flags.is_aborted());
    }

    #[test]
    fn test_stats_counters() {
        let stats = PipelineStats::new();
        stats.set_total_blocks(3);
        stats.record_read();
        stats.record_read();
        stats.record_hashed();
        stats.record_written();

        assert_eq!(stats.total_blocks(), 3);
        assert_eq!(stats.blocks_read(), 2);
        assert_eq!(stats.blocks_hashed(), 1);
        assert_eq!(stats.blocks_written(), 1);
    }

    #[test]
    fn test_run_small_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.sig");
        fs::write(&input, vec![0x5Au8; 3000]).unwrap();

        let summary = Coordinator::new(config_for(&input, &output)).run().unwrap();
        assert_eq!(summary.blocks, 3);
        assert_eq!(summary.bytes, 3000);
        assert_eq!(fs::metadata(&output).unwrap().len(), 12);
    }

    #[test]
    fn test_run_empty_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("empty.bin");
        let output = dir.path().join("out.sig");
        fs::write(&input, b"").unwrap();

        let summary = Coordinator::new(config_for(&input, &output)).run().unwrap();
        assert_eq!(summary.blocks, 0);
        assert!(output.exists());
        assert_eq!(fs::metadata(&output).unwrap().len(), 0);
    }

    #[test]
    fn test_pre_raised_abort_interrupts_promptly() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        let output = dir.path().join("out.sig");
        fs::write(&input, vec![0u8; 512 * 1024]).unwrap();

        let coordinator = Coordinator::new(config_for(&input, &output));
        coordinator.flags().abort();

        let start = Instant::now();
        let result = coordinator.run();
        assert!(matches!(result, Err(SignatureError::Interrupted)));
        // Workers observe the flag within the bounded-wait tick.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempdir().unwrap();
        let config = config_for(&dir.path().join("missing.bin"), &dir.path().join("out.sig"));
        assert!(matches!(
            Coordinator::new(config).run(),
            Err(SignatureError::Io(_))
        ));
    }
}
