//! Zstandard codec parameters shared by the pack and unpack engines.
//!
//! The engines drive the codec's raw streaming contexts directly
//! (`zstd::stream::raw`); this module only pins down the numbers both sides
//! agree on: frame magic, buffer sizes and the supported level range.

pub mod frame;

pub use frame::{FRAME_HEADER_SIZE_MAX, ZSTD_MAGIC, frame_content_size, is_frame, verify_magic};

use crate::{Error, Result};

/// Largest block the codec emits or accepts (128 KiB).
pub const BLOCK_SIZE_MAX: usize = 128 * 1024;

/// Size of a block header inside a frame.
const BLOCK_HEADER_SIZE: usize = 3;

/// Recommended decoder input chunk: one full block plus its header.
pub const DSTREAM_IN_SIZE: usize = BLOCK_SIZE_MAX + BLOCK_HEADER_SIZE;

/// Recommended decoder output chunk: one full block.
pub const DSTREAM_OUT_SIZE: usize = BLOCK_SIZE_MAX;

/// Recommended encoder input chunk.
pub const CSTREAM_IN_SIZE: usize = BLOCK_SIZE_MAX;

/// Recommended encoder output chunk, large enough to flush one block.
pub const CSTREAM_OUT_SIZE: usize = compress_bound(BLOCK_SIZE_MAX) + BLOCK_HEADER_SIZE + 4;

/// Size of one read-ahead segment of the decompression ring.
///
/// Slightly larger than [`DSTREAM_IN_SIZE`]; the ring holds two of these.
pub const READ_SEGMENT_SIZE: usize = BLOCK_SIZE_MAX + 10;

/// Worst-case compressed size of `src_size` input bytes.
pub const fn compress_bound(src_size: usize) -> usize {
    let margin = if src_size < BLOCK_SIZE_MAX {
        (BLOCK_SIZE_MAX - src_size) >> 11
    } else {
        0
    };
    src_size + (src_size >> 8) + margin
}

/// Highest compression level the codec accepts.
pub fn max_level() -> u32 {
    let max = *zstd::compression_level_range().end();
    u32::try_from(max).unwrap_or(0)
}

/// The codec's default compression level.
pub fn default_level() -> u32 {
    u32::try_from(zstd::DEFAULT_COMPRESSION_LEVEL).unwrap_or(3)
}

/// Validates a compression level against `[0, max_level()]`.
pub fn check_level(level: u32) -> Result<u32> {
    let max = max_level();
    if level > max {
        return Err(Error::InvalidCompressionLevel { level, max });
    }
    Ok(level)
}

/// Allocates a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn alloc_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory { requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_range() {
        assert!(max_level() >= 19);
        assert!(default_level() <= max_level());
        assert_eq!(check_level(0).unwrap(), 0);
        assert_eq!(check_level(max_level()).unwrap(), max_level());
        assert!(matches!(
            check_level(max_level() + 1),
            Err(Error::InvalidCompressionLevel { .. })
        ));
    }

    #[test]
    fn test_buffer_sizes() {
        assert!(CSTREAM_OUT_SIZE > CSTREAM_IN_SIZE);
        assert!(READ_SEGMENT_SIZE >= DSTREAM_IN_SIZE);
        assert_eq!(compress_bound(0), BLOCK_SIZE_MAX >> 11);
    }

    #[test]
    fn test_alloc_buffer() {
        let buf = alloc_buffer(16).unwrap();
        assert_eq!(buf, vec![0u8; 16]);
        assert!(matches!(
            alloc_buffer(usize::MAX),
            Err(Error::OutOfMemory { requested }) if requested == usize::MAX
        ));
    }
}
