//! Error types for pack and unpack operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes of the streaming engine and its host facade, along with a
//! convenient [`Result<T>`] type alias.
//!
//! Every error is terminal for the operation in progress. The engine never
//! retries internally; whether to retry (for example by re-opening the
//! archive) is the caller's decision. Bytes already written to a sink are not
//! rolled back, so partial output must be discarded by the caller.
//!
//! # Example
//!
//! ```rust,no_run
//! use zstarc::{DecompressionSession, Error};
//!
//! fn extract(path: &str) -> zstarc::Result<Vec<u8>> {
//!     let mut session = DecompressionSession::open(path)?;
//!     let mut out = Vec::new();
//!     match session.unpack(&mut out, |_| true) {
//!         Ok(_) => Ok(out),
//!         Err(Error::BadArchive(reason)) => {
//!             eprintln!("Not a valid zstd stream: {}", reason);
//!             Err(Error::BadArchive(reason))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;

/// Result codes understood by the file-manager host.
///
/// These are the numeric values the host API expects back from its entry
/// points; [`Error::host_code`] maps every error onto one of them.
pub mod host_code {
    /// Operation succeeded.
    pub const SUCCESS: i32 = 0;
    /// No more entries in the archive.
    pub const E_END_ARCHIVE: i32 = 10;
    /// Not enough memory.
    pub const E_NO_MEMORY: i32 = 11;
    /// CRC error in the data of the currently unpacked file.
    pub const E_BAD_DATA: i32 = 12;
    /// The archive is damaged.
    pub const E_BAD_ARCHIVE: i32 = 13;
    /// Archive format unknown.
    pub const E_UNKNOWN_FORMAT: i32 = 14;
    /// Cannot open existing file.
    pub const E_EOPEN: i32 = 15;
    /// Cannot create file.
    pub const E_ECREATE: i32 = 16;
    /// Error closing file.
    pub const E_ECLOSE: i32 = 17;
    /// Error reading from file.
    pub const E_EREAD: i32 = 18;
    /// Error writing to file.
    pub const E_EWRITE: i32 = 19;
    /// Buffer too small.
    pub const E_SMALL_BUF: i32 = 20;
    /// Function aborted by user.
    pub const E_EABORTED: i32 = 21;
    /// No files found.
    pub const E_NO_FILES: i32 = 22;
    /// Too many files to pack.
    pub const E_TOO_MANY_FILES: i32 = 23;
    /// Function not supported.
    pub const E_NOT_SUPPORTED: i32 = 24;
}

/// The main error type for pack and unpack operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Open | [`NotFound`][Self::NotFound], [`Io`][Self::Io] | Missing or unreadable archive |
/// | Data | [`BadArchive`][Self::BadArchive] | Corrupt or truncated compressed stream |
/// | I/O | [`ReadFailed`][Self::ReadFailed], [`WriteFailed`][Self::WriteFailed] | Source or sink failure |
/// | Encoder | [`Codec`][Self::Codec], [`InvalidCompressionLevel`][Self::InvalidCompressionLevel] | Encoder fault or bad level |
/// | Control | [`Aborted`][Self::Aborted], [`EndOfArchive`][Self::EndOfArchive] | Callback cancel, header exhausted |
/// | Host | [`NotSupported`][Self::NotSupported], [`NoFiles`][Self::NoFiles] | Request outside the single-entry model |
/// | Resources | [`OutOfMemory`][Self::OutOfMemory] | Buffer allocation failed |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred outside of the streaming read/write paths.
    ///
    /// Stat calls, creating the destination file, or removing a source after
    /// a move-pack surface here. Streaming reads and writes use
    /// [`ReadFailed`][Self::ReadFailed] and [`WriteFailed`][Self::WriteFailed]
    /// instead so the host can tell the two directions apart.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive file does not exist or is not a regular file.
    #[error("Archive not found: {path}")]
    NotFound {
        /// The path that was requested.
        path: String,
    },

    /// The compressed stream is malformed, corrupt, or truncated.
    ///
    /// Fatal for the current unpack; the remaining data is not decoded.
    #[error("Bad archive: {0}")]
    BadArchive(String),

    /// Reading from the underlying archive or pack source failed.
    #[error("Read failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// Writing decoded or encoded bytes to the sink failed.
    #[error("Write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// The encoder reported an internal fault, or the session was misused.
    ///
    /// A compression session that returned this error must be abandoned;
    /// no partial archive is valid.
    #[error("Codec error: {0}")]
    Codec(String),

    /// A compression level outside the codec's supported range was given.
    #[error("invalid compression level {level}: must be 0-{max}")]
    InvalidCompressionLevel {
        /// The level that was provided.
        level: u32,
        /// The highest level the codec accepts.
        max: u32,
    },

    /// The operation was cancelled through the progress callback.
    ///
    /// The callback returned `false`. Anything already written to the sink
    /// stays there and must be treated as invalid.
    #[error("Operation aborted")]
    Aborted,

    /// A buffer allocation failed while constructing a session.
    #[error("Out of memory: could not allocate {requested} bytes")]
    OutOfMemory {
        /// Size of the failed allocation.
        requested: usize,
    },

    /// The single entry has already been reported for this archive handle.
    #[error("No more entries in archive")]
    EndOfArchive,

    /// The host asked for a capability this engine does not provide.
    #[error("Not supported: {feature}")]
    NotSupported {
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// A pack request named no file to pack.
    #[error("No files to pack")]
    NoFiles,

    /// The configuration file could not be written.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error indicates damaged compressed data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::BadArchive(_))
    }

    /// Returns `true` for errors raised by the read or write side of a stream.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::ReadFailed(_) | Error::WriteFailed(_) | Error::NotFound { .. }
        )
    }

    /// Returns `true` if the operation was cancelled by the caller.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Returns `true` if starting the operation over might succeed.
    ///
    /// - `Aborted`: the user may simply restart
    /// - `Io`/`ReadFailed`/`WriteFailed` with a transient kind
    ///   (`WouldBlock`, `Interrupted`, `TimedOut`)
    ///
    /// The engine itself never acts on this; it only informs the host.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Aborted => true,
            Error::Io(e) | Error::ReadFailed(e) | Error::WriteFailed(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Maps this error onto the host's numeric result code.
    ///
    /// Codec faults map to [`host_code::E_ECREATE`] because they only occur
    /// while creating an archive.
    pub fn host_code(&self) -> i32 {
        match self {
            Error::Io(_) => host_code::E_EOPEN,
            Error::NotFound { .. } => host_code::E_EOPEN,
            Error::BadArchive(_) => host_code::E_BAD_ARCHIVE,
            Error::ReadFailed(_) => host_code::E_EREAD,
            Error::WriteFailed(_) => host_code::E_EWRITE,
            Error::Codec(_) => host_code::E_ECREATE,
            Error::InvalidCompressionLevel { .. } => host_code::E_ECREATE,
            Error::Aborted => host_code::E_EABORTED,
            Error::OutOfMemory { .. } => host_code::E_NO_MEMORY,
            Error::EndOfArchive => host_code::E_END_ARCHIVE,
            Error::NotSupported { .. } => host_code::E_NOT_SUPPORTED,
            Error::NoFiles => host_code::E_NO_FILES,
            Error::Config(_) => host_code::E_ECREATE,
        }
    }

    /// Creates a BadArchive error.
    pub fn bad_archive(reason: impl Into<String>) -> Self {
        Error::BadArchive(reason.into())
    }

    /// Creates a Codec error from an encoder failure.
    pub(crate) fn codec(err: io::Error) -> Self {
        Error::Codec(err.to_string())
    }

    /// Maps a failure to open an existing file, keeping "not found" distinct.
    pub(crate) fn open_failed(path: &std::path::Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.display().to_string(),
            },
            _ => Error::Io(err),
        }
    }
}

/// A specialized Result type for pack and unpack operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
        assert!(err.is_io());
    }

    #[test]
    fn test_bad_archive() {
        let err = Error::bad_archive("truncated frame");
        assert_eq!(err.to_string(), "Bad archive: truncated frame");
        assert!(err.is_corruption());
        assert_eq!(err.host_code(), host_code::E_BAD_ARCHIVE);
    }

    #[test]
    fn test_aborted() {
        let err = Error::Aborted;
        assert!(err.to_string().contains("aborted"));
        assert!(err.is_cancellation());
        assert!(err.is_recoverable());
        assert_eq!(err.host_code(), host_code::E_EABORTED);
    }

    #[test]
    fn test_invalid_compression_level() {
        let err = Error::InvalidCompressionLevel { level: 40, max: 22 };
        assert_eq!(err.to_string(), "invalid compression level 40: must be 0-22");
    }

    #[test]
    fn test_read_write_split() {
        let read = Error::ReadFailed(io::Error::other("disk gone"));
        let write = Error::WriteFailed(io::Error::other("disk full"));
        assert_eq!(read.host_code(), host_code::E_EREAD);
        assert_eq!(write.host_code(), host_code::E_EWRITE);
        assert!(read.to_string().contains("disk gone"));
        assert!(std::error::Error::source(&write).is_some());
    }

    #[test]
    fn test_is_recoverable_transient_io_errors() {
        for kind in [
            io::ErrorKind::WouldBlock,
            io::ErrorKind::Interrupted,
            io::ErrorKind::TimedOut,
        ] {
            assert!(Error::ReadFailed(io::Error::new(kind, "x")).is_recoverable());
        }
        assert!(!Error::ReadFailed(io::Error::new(io::ErrorKind::UnexpectedEof, "x")).is_recoverable());
        assert!(!Error::bad_archive("x").is_recoverable());
        assert!(!Error::OutOfMemory { requested: 1 }.is_recoverable());
    }

    #[test]
    fn test_host_codes() {
        assert_eq!(Error::EndOfArchive.host_code(), host_code::E_END_ARCHIVE);
        assert_eq!(
            Error::OutOfMemory { requested: 8 }.host_code(),
            host_code::E_NO_MEMORY
        );
        assert_eq!(
            Error::NotSupported { feature: "encryption" }.host_code(),
            host_code::E_NOT_SUPPORTED
        );
        assert_eq!(Error::Codec("boom".into()).host_code(), host_code::E_ECREATE);
        assert_eq!(Error::NoFiles.host_code(), host_code::E_NO_FILES);
        assert_eq!(
            Error::NotFound { path: "a.zst".into() }.host_code(),
            host_code::E_EOPEN
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
