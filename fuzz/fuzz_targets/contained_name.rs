//! Fuzz target for contained-name derivation.
//!
//! Run with: cargo +nightly fuzz run contained_name
//!
//! Properties checked:
//! - No panics on arbitrary UTF-8, including multi-byte characters
//!   around the dot
//! - The derived name never contains a path separator

#![no_main]

use libfuzzer_sys::fuzz_target;
use zstarc::identity::{archive_name, contained_name};

fuzz_target!(|data: &[u8]| {
    if let Ok(path) = std::str::from_utf8(data) {
        let name = contained_name(path);
        let last = archive_name(path);

        assert!(
            !name.contains('/') && !name.contains('\\'),
            "separator in derived name: {:?}",
            name
        );
        assert!(
            name.len() <= last.len() + 3,
            "derived name {:?} longer than expected for {:?}",
            name,
            last
        );
    }
});
