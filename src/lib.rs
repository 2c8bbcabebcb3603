//! # zstarc
//!
//! Exposes a single Zstandard-compressed file as a one-entry archive.
//!
//! The crate is the engine behind a file-manager archive plugin: the host
//! lists a `.zst` file as if it were an archive holding one file, extracts
//! it, tests it, or creates new ones. The heavy lifting lives in two
//! streaming sessions:
//!
//! - [`CompressionSession`]: push-style encoder with caller-owned, bounded
//!   buffers. Undersized output is normal flow control.
//! - [`DecompressionSession`]: pull-style decoder fed by a double-buffered
//!   read-ahead, so the next read is in flight while the previous segment is
//!   decoded.
//!
//! [`ArchiveIdentity`] supplies what the host displays (names, sizes,
//! timestamp), and the [`host`] module wraps it all in the host's
//! open / read-header / process / close protocol.
//!
//! ## Quick Start
//!
//! ### Extracting
//!
//! ```rust,no_run
//! use zstarc::{DecompressionSession, Result};
//!
//! fn main() -> Result<()> {
//!     let mut session = DecompressionSession::open("notes.txt.zst")?;
//!     let mut out = std::fs::File::create("notes.txt")?;
//!     let total = session.unpack(&mut out, |chunk| {
//!         println!("{} more bytes", chunk);
//!         true
//!     })?;
//!     println!("{} bytes extracted", total);
//!     Ok(())
//! }
//! ```
//!
//! ### Creating
//!
//! ```rust,no_run
//! use zstarc::{NoProgress, Result, pack_file};
//!
//! fn main() -> Result<()> {
//!     let stats = pack_file("notes.txt", "notes.txt.zst", 3, NoProgress)?;
//!     println!("{} -> {} bytes", stats.bytes_in, stats.bytes_out);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `async` | No | Tokio-based [`async_unpack`] session |
//! | `cli` | No | Command-line interface tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Every error is terminal for the
//! operation in progress, and nothing is retried internally. See [`Error`]
//! for the categories and [`Error::host_code`] for the mapping onto the
//! host's numeric result codes.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.
//! Lifecycle events are logged at `debug`, per-read and per-chunk detail at
//! `trace`.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod codec;
pub mod compress;
pub mod config;
pub mod decompress;
pub mod error;
pub mod host;
pub mod identity;
pub mod progress;
pub mod read_ahead;
pub mod timestamp;
pub mod window;

// Async module (requires "async" feature)
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod async_unpack;

pub use error::{Error, Result};
pub use timestamp::DosTimestamp;

// Re-export the streaming engine at crate root for convenience
pub use compress::{
    CompressionSession, MemPackStatus, MemPackStep, MemoryPacker, PackStats, pack_file,
    pack_stream,
};
pub use decompress::{DecompressionSession, SessionOptions, SessionState};
pub use identity::{ArchiveIdentity, HeaderData};

// Re-export read-ahead sources
pub use read_ahead::{BlockingReader, ChunkedReader, ReadAhead, ReadCompletion, ThreadedFileReader};

// Re-export progress API
pub use progress::{
    AtomicProgress, NoProgress, ProcessDataProc, ProcessDataSlot, ProgressReporter, progress_fn,
};

pub use config::Configuration;

#[cfg(feature = "async")]
pub use async_unpack::AsyncDecompressionSession;
