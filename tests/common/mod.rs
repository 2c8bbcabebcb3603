//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zstarc::{NoProgress, pack_stream};

/// Mildly compressible data: random runs over a small alphabet.
pub fn sample_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let byte = b"abcdefgh \n"[rng.gen_range(0..10)];
        let run = rng.gen_range(1..12).min(len - data.len());
        data.extend(std::iter::repeat_n(byte, run));
    }
    data
}

/// Incompressible data.
pub fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

/// Compresses with the crate's own streaming packer.
///
/// The frame header of the result does not declare a content size.
pub fn pack(data: &[u8], level: u32) -> Vec<u8> {
    let mut out = Vec::new();
    pack_stream(Cursor::new(data), &mut out, level, "test", NoProgress)
        .expect("Failed to pack test data");
    out
}

/// Compresses in one shot; the frame header declares the content size.
pub fn pack_with_size(data: &[u8], level: i32) -> Vec<u8> {
    zstd::bulk::compress(data, level).expect("Failed to compress test data")
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("Failed to write test file");
    path
}
