//! Concurrent block-signature pipeline
//!
//! This module implements the reader → hashers → writer pipeline over
//! bounded queues with pooled, recycled buffers:
//!
//! ```text
//!                ┌──────────────────────────┐
//!                │       Coordinator        │
//!                │  (runs Reader inline)    │
//!                └────────────┬─────────────┘
//!                             │ job_queue
//!        ┌────────────────────┼────────────────────┐
//!        │                    │                    │
//!  ┌─────▼─────┐        ┌─────▼─────┐        ┌─────▼─────┐
//!  │ Hasher 1  │        │ Hasher 2  │  ...   │ Hasher N  │
//!  │  CRC32    │        │  CRC32    │        │  CRC32    │
//!  └─────┬─────┘        └─────┬─────┘        └─────┬─────┘
//!        └────────────────────┼────────────────────┘
//!                             │ result_queue
//!                       ┌─────▼─────┐
//!                       │  Writer   │
//!                       │ seek+put  │
//!                       └───────────┘
//! ```
//!
//! Buffer recycling flows the other way: hashers return chunk buffers to
//! `free_chunks` (stalling the reader when they fall behind) and the
//! writer returns result records to `free_results`.

pub mod coordinator;
pub mod hasher;
pub mod pool;
pub mod queue;
pub mod reader;
pub mod writer;

pub use coordinator::{Coordinator, PipelineFlags, PipelineStats, SignatureSummary};
pub use pool::{BufferPool, ChunkBuffer, ResultRecord};
pub use queue::BoundedQueue;
