//! Fuzz target for decoding arbitrary bytes.
//!
//! Feeds the input through a decompression session with small buffers so
//! that frame boundaries land inside read segments and output fills up
//! often. Errors are expected; panics and hangs are not.
//!
//! Run with: cargo +nightly fuzz run unpack

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use zstarc::{ChunkedReader, DecompressionSession, SessionOptions};

fuzz_target!(|data: &[u8]| {
    let schedule: Vec<usize> = data.iter().take(4).map(|b| (*b as usize % 64) + 1).collect();
    let reader = ChunkedReader::new(Cursor::new(data.to_vec()), schedule);
    let options = SessionOptions::new().segment_size(256).output_size(97);

    let Ok(mut session) = DecompressionSession::with_options(reader, options) else {
        return;
    };
    let _ = session.uncompressed_size();

    // Cap decoded output so tiny frames declaring huge sizes stay cheap
    let mut budget: usize = 1 << 24;
    let mut sink = std::io::sink();
    let result = session.unpack(&mut sink, |n| {
        budget = budget.saturating_sub(n);
        budget > 0
    });

    if let Ok(total) = result {
        assert_eq!(total, session.total_out());
    }
});
