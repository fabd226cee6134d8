//! Writer stage - persists CRCs at their positional offsets
//!
//! A single thread owns the output file. Records arrive in whatever order
//! the hashers finish; each is written at `block_index * 4`, so no
//! buffering or reordering is ever needed. Consumed records are reset and
//! recycled to the free pool.

use crate::error::{Result, SignatureError, WorkerError};
use crate::io::SignatureWriter;
use crate::pipeline::coordinator::{PipelineFlags, PipelineStats};
use crate::pipeline::pool::ResultRecord;
use crate::pipeline::queue::BoundedQueue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// The write worker thread
pub(crate) struct WriteWorker {
    handle: Option<JoinHandle<Result<()>>>,
}

impl WriteWorker {
    /// Spawn the writer thread; it creates (or truncates) the output file
    /// before consuming any results, so even a zero-block run produces an
    /// empty signature file.
    pub fn spawn(
        output: PathBuf,
        result_queue: Arc<BoundedQueue<ResultRecord>>,
        free_results: Arc<BoundedQueue<ResultRecord>>,
        flags: Arc<PipelineFlags>,
        stats: Arc<PipelineStats>,
    ) -> std::result::Result<Self, WorkerError> {
        let handle = thread::Builder::new()
            .name("sig-write".into())
            .spawn(move || write_loop(&output, &result_queue, &free_results, &flags, &stats))
            .map_err(|e| WorkerError::SpawnFailed {
                id: 0,
                reason: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the writer to finish
    ///
    /// A panicked thread leaves no error of its own to surface, so it
    /// maps to the catch-all "Unknown error" diagnostic.
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => {
                    warn!("Writer thread panicked");
                    Err(SignatureError::Unknown)
                }
            },
            None => Ok(()),
        }
    }
}

/// Main writer loop
///
/// The drain exit condition requires every submitted block to have been
/// persisted (`blocks_written == blocks_read`), which subsumes "job queue
/// empty and result queue empty": a block counted as read but not written
/// is still in a queue or held by a hasher.
fn write_loop(
    output: &Path,
    result_queue: &BoundedQueue<ResultRecord>,
    free_results: &BoundedQueue<ResultRecord>,
    flags: &PipelineFlags,
    stats: &PipelineStats,
) -> Result<()> {
    debug!(output = %output.display(), "Writer starting");

    let mut sink = match SignatureWriter::create(output) {
        Ok(sink) => sink,
        Err(e) => {
            flags.abort();
            return Err(SignatureError::Io(e));
        }
    };

    loop {
        let done = || {
            flags.is_aborted()
                || (flags.draining() && stats.blocks_written() == stats.blocks_read())
        };
        let Some(mut record) = result_queue.pop_blocking(done) else {
            break;
        };

        if let Err(source) = sink.write_record(record.block_index, record.crc) {
            flags.abort();
            return Err(SignatureError::WriteFailed {
                block_index: record.block_index,
                source,
            });
        }

        stats.record_written();
        record.reset();
        let _ = free_results.try_push(record);
    }

    if let Err(e) = sink.flush() {
        flags.abort();
        return Err(SignatureError::Io(e));
    }

    debug!(blocks = stats.blocks_written(), "Writer shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_maps_panic_to_unknown() {
        let worker = WriteWorker {
            handle: Some(thread::spawn(|| panic!("induced writer failure"))),
        };

        assert!(matches!(worker.join(), Err(SignatureError::Unknown)));
    }

    #[test]
    fn test_join_passes_through_worker_result() {
        let worker = WriteWorker {
            handle: Some(thread::spawn(|| Ok(()))),
        };

        assert!(worker.join().is_ok());
    }
}
