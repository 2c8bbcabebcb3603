//! Frame sniffing: magic-number detection and declared content size.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Zstandard frame magic number (0xFD2FB528, little-endian).
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Skippable frames use magic numbers 0x184D2A50..=0x184D2A5F.
const SKIPPABLE_MAGIC_BASE: u32 = 0x184D_2A50;
const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;

/// Largest possible frame header, enough to read the declared content size.
pub const FRAME_HEADER_SIZE_MAX: usize = 18;

/// Returns `true` if `bytes` starts with a zstd or skippable frame magic number.
///
/// # Example
///
/// ```rust
/// use zstarc::codec::is_frame;
///
/// assert!(is_frame(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]));
/// assert!(!is_frame(b"PK\x03\x04"));
/// assert!(!is_frame(&[0x28, 0xB5]));
/// ```
pub fn is_frame(bytes: &[u8]) -> bool {
    let Some(magic) = bytes.first_chunk::<4>() else {
        return false;
    };
    if *magic == ZSTD_MAGIC {
        return true;
    }
    u32::from_le_bytes(*magic) & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC_BASE
}

/// Reads the first four bytes of a file and tests them for a frame magic number.
///
/// This is the host's archive-detection predicate. Any I/O failure, including
/// a file shorter than four bytes, yields `false`.
pub fn verify_magic(path: impl AsRef<Path>) -> bool {
    let mut magic = [0u8; 4];
    let result = File::open(path.as_ref()).and_then(|mut f| f.read_exact(&mut magic));
    match result {
        Ok(()) => is_frame(&magic),
        Err(e) => {
            log::debug!("magic check failed for '{}': {}", path.as_ref().display(), e);
            false
        }
    }
}

/// Decodes the content size declared by a frame header.
///
/// Returns `None` when the header does not declare a size, when it cannot be
/// parsed, or when `header` is not a regular zstd frame. `Some(0)` is only
/// returned for a frame that explicitly declares an empty payload.
pub fn frame_content_size(header: &[u8]) -> Option<u64> {
    if !header.starts_with(&ZSTD_MAGIC) {
        return None;
    }
    zstd::zstd_safe::get_frame_content_size(header).ok().flatten()
}
