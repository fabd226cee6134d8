//! Error types for blocksig
//!
//! This module defines the error hierarchy for the signature pipeline:
//! - Configuration and CLI errors (surfaced before any worker spawns)
//! - I/O errors from the reader and writer stages, with block context
//! - Worker thread errors (spawn failure, panic)
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the block index and path context
//! - Fail fast: I/O errors abort the pipeline, no retries

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the blocksig application
#[derive(Error, Debug)]
pub enum SignatureError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Read failure while filling a block buffer
    #[error("Failed to read block {block_index}: {source}")]
    ReadFailed {
        block_index: u64,
        source: std::io::Error,
    },

    /// Write failure while persisting a block CRC
    #[error("Failed to write result for block {block_index}: {source}")]
    WriteFailed {
        block_index: u64,
        source: std::io::Error,
    },

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors outside the per-block paths (open, truncate, flush)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline aborted by signal or by a failure in another worker
    #[error("Operation interrupted")]
    Interrupted,

    /// A worker died without leaving a diagnosable cause
    #[error("Unknown error")]
    Unknown,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Input file missing
    #[error("Input file '{path}' does not exist")]
    InputNotFound { path: PathBuf },

    /// Input path is not a regular file
    #[error("Input path '{path}' is not a regular file")]
    InputNotFile { path: PathBuf },

    /// Output parent directory missing
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Block size outside the accepted range
    #[error("Invalid block size {size}: must be between {min} and {max} bytes")]
    InvalidBlockSize { size: u64, min: u64, max: u64 },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },
}

/// Worker thread errors
///
/// A worker that panics is reported as [`SignatureError::Unknown`] at
/// join time rather than through this enum - the thread left nothing
/// diagnosable behind.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker initialization failed
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },
}

impl SignatureError {
    /// True when the error carries no cause worth reporting beyond the
    /// generic "Unknown error" diagnostic.
    pub fn is_unknown(&self) -> bool {
        matches!(self, SignatureError::Unknown)
    }

    /// Render this error the way the CLI reports it on standard output:
    /// `"Error: <detail>"`, or the bare `"Unknown error"` when there is
    /// nothing to report.
    pub fn cli_report(&self) -> String {
        if self.is_unknown() {
            self.to_string()
        } else {
            format!("Error: {}", self)
        }
    }
}

/// Result type alias for SignatureError
pub type Result<T> = std::result::Result<T, SignatureError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
