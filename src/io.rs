//! Block-granular file I/O for the signature pipeline
//!
//! Two thin collaborators wrap the filesystem:
//! - [`BlockReader`] opens the input once, queries its size once, and fills
//!   caller-owned block buffers sequentially, zero-padding the tail block.
//! - [`SignatureWriter`] creates/truncates the output and persists each CRC
//!   at its positional offset (`block_index * 4`), so results may arrive in
//!   any order.
//!
//! Both are byte-exact and carry no pipeline state; error mapping to block
//! context happens in the worker loops.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Size of one serialized CRC record on disk
pub const RECORD_SIZE: u64 = 4;

/// Sequential reader over fixed-size blocks of the input file
pub struct BlockReader {
    file: File,
    file_size: u64,
    remaining: u64,
}

impl BlockReader {
    /// Open the input file and capture its size
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        Ok(Self {
            file,
            file_size,
            remaining: file_size,
        })
    }

    /// Total input size in bytes, as captured at open time
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of blocks for the given block size: ceil(file_size / block_size)
    pub fn block_count(&self, block_size: u64) -> u64 {
        self.file_size / block_size + u64::from(self.file_size % block_size > 0)
    }

    /// Fill `buf` with the next block of input
    ///
    /// Reads until the buffer is full or the input is exhausted; any unread
    /// tail is zeroed so every block presented to the hashers has identical
    /// length.
    pub fn read_block(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let mut filled = 0usize;

        while filled < want {
            match self.file.read(&mut buf[filled..want])? {
                0 => break,
                n => filled += n,
            }
        }

        self.remaining -= filled as u64;
        buf[filled..].fill(0);

        Ok(())
    }
}

/// Positional writer for the signature output file
pub struct SignatureWriter {
    file: File,
}

impl SignatureWriter {
    /// Create (or truncate) the output file
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self { file })
    }

    /// Write one CRC at its block's offset
    ///
    /// CRCs are fixed little-endian on disk, making signatures portable
    /// across hosts of differing endianness.
    pub fn write_record(&mut self, block_index: u64, crc: u32) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(block_index * RECORD_SIZE))?;
        self.file.write_all(&crc.to_le_bytes())
    }

    /// Flush buffered writes to the OS
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}
