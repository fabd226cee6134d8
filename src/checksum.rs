//! Block checksum calculation using crc32fast
//!
//! crc32fast implements the canonical CRC-32 (IEEE 802.3, reflected
//! polynomial 0xEDB88320) with SSE4.2/PCLMULQDQ acceleration where the
//! hardware supports it. Blocks are hashed whole, so no streaming state
//! is needed.

/// Compute the CRC-32 of a full block
///
/// Deterministic and pure. The caller guarantees `data` is already padded
/// to the block size; every block therefore hashes the same input length.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Compute the CRC-32 of `data` zero-padded on the right to `block_size`
///
/// Reference path for verification and tests. The pipeline itself never
/// pads here - chunk buffers are fixed-size and zeroed before refill.
pub fn crc32_padded(data: &[u8], block_size: usize) -> u32 {
    if data.len() < block_size {
        let mut padded = vec![0u8; block_size];
        padded[..data.len()].copy_from_slice(data);
        crc32fast::hash(&padded)
    } else {
        crc32fast::hash(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        // CRC-32/ISO-HDLC check value from the rocksoft model.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_deterministic() {
        let data = vec![0x42u8; 1024 * 1024];
        assert_eq!(crc32(&data), crc32(&data));
    }

    #[test]
    fn test_padded_matches_manual_padding() {
        let data = b"\x01\x02\x03";
        let mut manual = vec![0u8; 8];
        manual[..3].copy_from_slice(data);

        assert_eq!(crc32_padded(data, 8), crc32(&manual));
    }

    #[test]
    fn test_padded_noop_when_full() {
        let data = b"full";
        assert_eq!(crc32_padded(data, 4), crc32(data));
    }

    #[test]
    fn test_padding_changes_value() {
        // Zero padding is part of the block identity.
        let data = b"tail";
        assert_ne!(crc32_padded(data, 16), crc32(data));
    }
}
