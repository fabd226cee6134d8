//! blocksig - Block-wise CRC32 File Signature Generator
//!
//! Splits an input file into fixed-size blocks, computes each block's
//! CRC32 in parallel, and writes the checksums to a signature file in
//! block order. Designed for throughput: one sequential reader, a pool of
//! hasher threads, and a single positional writer, coordinated through
//! bounded queues with pre-allocated, recycled buffers so memory stays
//! `O(workers × block_size)` regardless of input size.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Input File                               │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │ sequential reads
//!                               ▼
//!                        ┌─────────────┐
//!                        │   Reader    │  (coordinator thread)
//!                        └──────┬──────┘
//!                               │ job_queue (bounded, SPMC)
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//!  ┌───────────┐          ┌───────────┐          ┌───────────┐
//!  │ Hasher 1  │          │ Hasher 2  │   ...    │ Hasher N  │
//!  └─────┬─────┘          └─────┬─────┘          └─────┬─────┘
//!        └──────────────────────┼──────────────────────┘
//!                               │ result_queue (bounded, MPSC)
//!                               ▼
//!                        ┌─────────────┐
//!                        │   Writer    │  seek(block * 4), put CRC
//!                        └──────┬──────┘
//!                               ▼
//!                    ┌───────────────────┐
//!                    │  Signature File   │
//!                    │  (LE u32 per      │
//!                    │   block index)    │
//!                    └───────────────────┘
//! ```
//!
//! Chunk buffers recycle from the hashers back to the reader and result
//! records from the writer back to the hashers, so the free-pool queues
//! double as backpressure: a slow stage stalls its upstream without
//! unbounded buffering.
//!
//! # Example
//!
//! ```bash
//! # Sign with the default 1 MiB blocks
//! blocksig big.iso big.sig
//!
//! # Smaller blocks, explicit parallelism, no spinner
//! blocksig big.iso big.sig --bs 65536 -w 16 -q
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod progress;

pub use config::{CliArgs, SigConfig};
pub use error::{Result, SignatureError};
pub use pipeline::{Coordinator, SignatureSummary};
