//! Configuration types for blocksig
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//!
//! All path and range validation happens here, before the coordinator
//! spawns a single worker thread.

use crate::error::{ConfigError, ConfigResult};
use clap::Parser;
use std::path::PathBuf;

/// Default block size: 1 MiB
pub const DEFAULT_BLOCK_SIZE: u64 = 1_048_576;

/// Minimum accepted block size
pub const MIN_BLOCK_SIZE: u64 = 1024;

/// Maximum accepted block size: 64 MiB
pub const MAX_BLOCK_SIZE: u64 = 64 * 1_048_576;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Fallback hasher count when hardware concurrency cannot be determined
const FALLBACK_WORKERS: usize = 4;

/// Block-wise CRC32 file signature generator
#[derive(Parser, Debug, Clone)]
#[command(
    name = "blocksig",
    version,
    about = "Block-wise CRC32 file signature generator",
    long_about = "Splits the input file into fixed-size blocks, computes each block's \
                  CRC32 in parallel, and writes the checksums to the output file in \
                  block order.\n\n\
                  The output is a flat array of little-endian 32-bit CRCs, one per \
                  block, at offset blockIndex * 4. The tail block is zero-padded to \
                  the block size before hashing.",
    after_help = "EXAMPLES:\n    \
        blocksig big.iso big.sig\n    \
        blocksig big.iso big.sig --bs 65536\n    \
        blocksig big.iso big.sig -w 16 -q"
)]
pub struct CliArgs {
    /// Input file to sign
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output signature file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Block size in bytes
    #[arg(
        short = 'b',
        long = "bs",
        alias = "block-size",
        default_value_t = DEFAULT_BLOCK_SIZE,
        value_name = "BYTES"
    )]
    pub block_size: u64,

    /// Number of hasher threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (worker lifecycle, per-stage stats)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct SigConfig {
    /// Input file path
    pub input_path: PathBuf,

    /// Output signature path
    pub output_path: PathBuf,

    /// Block size in bytes
    pub block_size: u64,

    /// Number of hasher threads
    pub worker_count: usize,

    /// Show progress spinner
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl SigConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> ConfigResult<Self> {
        if !args.input.exists() {
            return Err(ConfigError::InputNotFound { path: args.input });
        }

        if !args.input.is_file() {
            return Err(ConfigError::InputNotFile { path: args.input });
        }

        if args.block_size < MIN_BLOCK_SIZE || args.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidBlockSize {
                size: args.block_size,
                min: MIN_BLOCK_SIZE,
                max: MAX_BLOCK_SIZE,
            });
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        // The writer creates the file itself; only the parent must exist.
        if let Some(parent) = args.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ConfigError::InvalidOutputPath {
                    path: args.output.clone(),
                    reason: format!("Parent directory '{}' does not exist", parent.display()),
                });
            }
        }

        Ok(Self {
            input_path: args.input,
            output_path: args.output,
            block_size: args.block_size,
            worker_count: args.workers,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }

    /// Pool size for chunk buffers and result records
    ///
    /// Two entries per hasher so workers cannot stall on both handshakes
    /// (chunk acquire, result acquire) while work remains.
    pub fn pool_size(&self) -> usize {
        self.worker_count * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn args_for(input: PathBuf, output: PathBuf) -> CliArgs {
        CliArgs {
            input,
            output,
            block_size: DEFAULT_BLOCK_SIZE,
            workers: 4,
            quiet: true,
            verbose: false,
        }
    }

    #[test]
    fn test_valid_config() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        fs::write(&input, b"data").unwrap();

        let config = SigConfig::from_args(args_for(input, dir.path().join("out.sig"))).unwrap();
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.pool_size(), 8);
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let args = args_for(dir.path().join("missing.bin"), dir.path().join("out.sig"));
        assert!(matches!(
            SigConfig::from_args(args),
            Err(ConfigError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_input_not_a_file() {
        let dir = tempdir().unwrap();
        let args = args_for(dir.path().to_path_buf(), dir.path().join("out.sig"));
        assert!(matches!(
            SigConfig::from_args(args),
            Err(ConfigError::InputNotFile { .. })
        ));
    }

    #[test]
    fn test_missing_output_parent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        fs::write(&input, b"data").unwrap();

        let args = args_for(input, dir.path().join("nope").join("out.sig"));
        assert!(matches!(
            SigConfig::from_args(args),
            Err(ConfigError::InvalidOutputPath { .. })
        ));
    }

    #[test]
    fn test_block_size_range() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        fs::write(&input, b"data").unwrap();

        let mut args = args_for(input.clone(), dir.path().join("out.sig"));
        args.block_size = MIN_BLOCK_SIZE - 1;
        assert!(matches!(
            SigConfig::from_args(args),
            Err(ConfigError::InvalidBlockSize { .. })
        ));

        let mut args = args_for(input.clone(), dir.path().join("out.sig"));
        args.block_size = MAX_BLOCK_SIZE + 1;
        assert!(matches!(
            SigConfig::from_args(args),
            Err(ConfigError::InvalidBlockSize { .. })
        ));

        // Both range edges are accepted.
        for size in [MIN_BLOCK_SIZE, MAX_BLOCK_SIZE] {
            let mut args = args_for(input.clone(), dir.path().join("out.sig"));
            args.block_size = size;
            assert!(SigConfig::from_args(args).is_ok());
        }
    }

    #[test]
    fn test_worker_count_range() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.bin");
        fs::write(&input, b"data").unwrap();

        let mut args = args_for(input, dir.path().join("out.sig"));
        args.workers = 0;
        assert!(matches!(
            SigConfig::from_args(args),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }
}
