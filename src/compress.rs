//! Bounded-buffer compression.
//!
//! [`CompressionSession`] is a push-style encoder: the caller hands it input
//! and an output buffer of any size, and it reports how much of each side it
//! used. Small output buffers are normal flow control, not an error; the
//! caller just calls again.
//!
//! Two drivers sit on top of the one session type:
//!
//! - [`pack_stream`] / [`pack_file`]: read a source in fixed chunks and
//!   write a complete frame to a sink.
//! - [`MemoryPacker`]: the host's pack-to-buffer mode, where both input and
//!   output are caller-owned buffers handed over one call at a time.
//!
//! # Example
//!
//! ```rust
//! use zstarc::CompressionSession;
//!
//! let mut session = CompressionSession::new(3).unwrap();
//! let mut frame = Vec::new();
//! let mut out = [0u8; 16];
//!
//! let mut input: &[u8] = b"some bytes to pack";
//! while !input.is_empty() {
//!     let (taken, written) = session.add_data(input, &mut out).unwrap();
//!     frame.extend_from_slice(&out[..written]);
//!     input = &input[taken..];
//! }
//! loop {
//!     let (done, written) = session.finish(&mut out).unwrap();
//!     frame.extend_from_slice(&out[..written]);
//!     if done {
//!         break;
//!     }
//! }
//! assert_eq!(zstd::decode_all(&frame[..]).unwrap(), b"some bytes to pack");
//! ```

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use zstd::stream::raw::{Encoder, Operation, OutBuffer};

use crate::codec::{self, CSTREAM_IN_SIZE, CSTREAM_OUT_SIZE, alloc_buffer};
use crate::progress::ProgressReporter;
use crate::read_ahead::read_full;
use crate::{Error, Result};

/// Incremental zstd encoder with caller-owned buffers.
pub struct CompressionSession {
    encoder: Encoder<'static>,
    level: u32,
    finished: bool,
}

impl std::fmt::Debug for CompressionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionSession")
            .field("level", &self.level)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl CompressionSession {
    /// Creates an encoder at `level`.
    ///
    /// The level must already be within `[0, codec::max_level()]`; the
    /// configuration layer clamps it. Use
    /// [`with_checked_level`](Self::with_checked_level) when the level comes
    /// straight from user input.
    pub fn new(level: u32) -> Result<Self> {
        debug_assert!(level <= codec::max_level(), "compression level {level} out of range");
        let raw_level = i32::try_from(level).map_err(|_| Error::InvalidCompressionLevel {
            level,
            max: codec::max_level(),
        })?;
        let encoder = Encoder::new(raw_level).map_err(Error::codec)?;
        log::debug!("compression session created at level {}", level);
        Ok(Self {
            encoder,
            level,
            finished: false,
        })
    }

    /// Creates an encoder after validating `level`.
    pub fn with_checked_level(level: u32) -> Result<Self> {
        Self::new(codec::check_level(level)?)
    }

    /// The compression level this session was created with.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns `true` once [`finish`](Self::finish) has closed the frame.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feeds input and collects whatever output fits.
    ///
    /// Returns `(bytes_consumed, bytes_produced)`. Either may be less than
    /// the buffer it refers to; call again with the unconsumed remainder and
    /// a drained output buffer.
    pub fn add_data(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize)> {
        self.ensure_open()?;
        let status = self
            .encoder
            .run_on_buffers(input, output)
            .map_err(Error::codec)?;
        Ok((status.bytes_read, status.bytes_written))
    }

    /// Flushes and closes the frame.
    ///
    /// Returns `(done, bytes_produced)`. `done == false` means `output` was
    /// too small for the rest of the flush; drain it and call again. After
    /// `done == true` the session accepts no further calls.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<(bool, usize)> {
        self.ensure_open()?;
        let mut out = OutBuffer::around(output);
        let remaining = self.encoder.finish(&mut out, true).map_err(Error::codec)?;
        let written = out.pos();
        if remaining == 0 {
            self.finished = true;
            log::debug!("compression session finished");
        }
        Ok((remaining == 0, written))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(Error::Codec("session already finished".into()));
        }
        Ok(())
    }
}

/// Byte counts of a completed pack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackStats {
    /// Uncompressed bytes read from the source.
    pub bytes_in: u64,
    /// Compressed bytes written to the sink.
    pub bytes_out: u64,
}

impl PackStats {
    /// Compressed size relative to the input (1.0 for empty input).
    pub fn ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            1.0
        } else {
            self.bytes_out as f64 / self.bytes_in as f64
        }
    }
}

/// Compresses everything `source` yields into one frame written to `sink`.
///
/// `progress` is told the size of every input chunk after it has been
/// encoded; returning `false` aborts with [`Error::Aborted`] and leaves the
/// sink holding an incomplete frame.
pub fn pack_stream<R, W, P>(
    mut source: R,
    mut sink: W,
    level: u32,
    identifier: &str,
    mut progress: P,
) -> Result<PackStats>
where
    R: Read,
    W: Write,
    P: ProgressReporter,
{
    let mut session = CompressionSession::new(level)?;
    let mut input = alloc_buffer(CSTREAM_IN_SIZE)?;
    let mut output = alloc_buffer(CSTREAM_OUT_SIZE)?;
    let mut stats = PackStats::default();

    loop {
        let n = read_full(&mut source, &mut input).map_err(Error::ReadFailed)?;
        if n == 0 {
            break;
        }
        stats.bytes_in += n as u64;

        let mut chunk = &input[..n];
        while !chunk.is_empty() {
            let (taken, written) = session.add_data(chunk, &mut output)?;
            sink.write_all(&output[..written])
                .map_err(Error::WriteFailed)?;
            stats.bytes_out += written as u64;
            chunk = &chunk[taken..];
        }
        log::trace!("packed chunk of {} bytes", n);
        if !progress.on_chunk(identifier, n) {
            return Err(Error::Aborted);
        }
        if n < input.len() {
            break;
        }
    }

    loop {
        let (done, written) = session.finish(&mut output)?;
        sink.write_all(&output[..written])
            .map_err(Error::WriteFailed)?;
        stats.bytes_out += written as u64;
        if done {
            break;
        }
    }
    sink.flush().map_err(Error::WriteFailed)?;

    log::debug!(
        "packed {} bytes into {} bytes at level {}",
        stats.bytes_in,
        stats.bytes_out,
        level
    );
    Ok(stats)
}

/// Compresses `src` into a new file at `dest`.
///
/// On any failure, including cancellation, the partially written
/// destination is removed.
pub fn pack_file<P: ProgressReporter>(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    level: u32,
    progress: P,
) -> Result<PackStats> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    let source = File::open(src).map_err(|e| Error::open_failed(src, e))?;
    let sink = BufWriter::new(File::create(dest)?);
    let identifier = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| src.display().to_string());

    let result = pack_stream(source, sink, level, &identifier, progress);
    if let Err(e) = &result {
        log::debug!("pack of '{}' failed ({}), removing output", src.display(), e);
        if let Err(remove_err) = std::fs::remove_file(dest) {
            log::warn!(
                "could not remove partial archive '{}': {}",
                dest.display(),
                remove_err
            );
        }
    }
    result
}

/// Whether a memory pack call left work to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemPackStatus {
    /// Call again: input remains, or the flush did not fit.
    Ok,
    /// The frame is complete.
    Done,
}

/// Result of one [`MemoryPacker::pack`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemPackStep {
    /// Input bytes consumed.
    pub taken: usize,
    /// Output bytes produced.
    pub written: usize,
    /// Whether the stream is complete.
    pub status: MemPackStatus,
}

/// Pack-to-buffer adapter for hosts that move data through fixed buffers.
///
/// The host calls [`pack`](Self::pack) with whatever input it has; an empty
/// input slice means "no more input", which switches to flushing. The host
/// keeps calling until it sees [`MemPackStatus::Done`].
#[derive(Debug)]
pub struct MemoryPacker {
    session: CompressionSession,
    total_in: u64,
    total_out: u64,
}

impl MemoryPacker {
    /// Starts a memory pack at `level`.
    pub fn new(level: u32) -> Result<Self> {
        Ok(Self {
            session: CompressionSession::new(level)?,
            total_in: 0,
            total_out: 0,
        })
    }

    /// Advances the pack by one step.
    pub fn pack(&mut self, input: &[u8], output: &mut [u8]) -> Result<MemPackStep> {
        let step = if input.is_empty() {
            let (done, written) = self.session.finish(output)?;
            MemPackStep {
                taken: 0,
                written,
                status: if done {
                    MemPackStatus::Done
                } else {
                    MemPackStatus::Ok
                },
            }
        } else {
            let (taken, written) = self.session.add_data(input, output)?;
            MemPackStep {
                taken,
                written,
                status: MemPackStatus::Ok,
            }
        };
        self.total_in += step.taken as u64;
        self.total_out += step.written as u64;
        Ok(step)
    }

    /// Totals so far.
    pub fn stats(&self) -> PackStats {
        PackStats {
            bytes_in: self.total_in,
            bytes_out: self.total_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, progress_fn};

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 97) as u8).collect()
    }

    fn pack_with_output(data: &[u8], level: u32, k: usize) -> Vec<u8> {
        let mut session = CompressionSession::new(level).unwrap();
        let mut out = vec![0u8; k];
        let mut frame = Vec::new();
        let mut input = data;
        while !input.is_empty() {
            let (taken, written) = session.add_data(input, &mut out).unwrap();
            frame.extend_from_slice(&out[..written]);
            input = &input[taken..];
        }
        loop {
            let (done, written) = session.finish(&mut out).unwrap();
            frame.extend_from_slice(&out[..written]);
            if done {
                break;
            }
        }
        frame
    }

    #[test]
    fn test_one_byte_output_buffer() {
        let data = sample(5000);
        let frame = pack_with_output(&data, 3, 1);
        assert_eq!(zstd::decode_all(&frame[..]).unwrap(), data);
    }

    #[test]
    fn test_empty_input() {
        let frame = pack_with_output(b"", 3, 64);
        assert!(codec::is_frame(&frame));
        assert!(zstd::decode_all(&frame[..]).unwrap().is_empty());
    }

    #[test]
    fn test_finished_session_rejects_calls() {
        let mut session = CompressionSession::new(1).unwrap();
        let mut out = [0u8; 256];
        let (done, _) = session.finish(&mut out).unwrap();
        assert!(done);
        assert!(session.is_finished());
        assert!(matches!(session.add_data(b"x", &mut out), Err(Error::Codec(_))));
        assert!(matches!(session.finish(&mut out), Err(Error::Codec(_))));
    }

    #[test]
    fn test_checked_level() {
        assert!(CompressionSession::with_checked_level(codec::max_level()).is_ok());
        assert!(matches!(
            CompressionSession::with_checked_level(codec::max_level() + 1),
            Err(Error::InvalidCompressionLevel { .. })
        ));
    }

    #[test]
    fn test_pack_stream_reports_chunks() {
        let data = sample(CSTREAM_IN_SIZE * 2 + 17);
        let mut chunks = Vec::new();
        let mut packed = Vec::new();
        let stats = pack_stream(
            &data[..],
            &mut packed,
            3,
            "data.bin",
            progress_fn(|name: &str, n| {
                assert_eq!(name, "data.bin");
                chunks.push(n);
                true
            }),
        )
        .unwrap();
        assert_eq!(chunks, vec![CSTREAM_IN_SIZE, CSTREAM_IN_SIZE, 17]);
        assert_eq!(stats.bytes_in, data.len() as u64);
        assert_eq!(stats.bytes_out, packed.len() as u64);
        assert_eq!(zstd::decode_all(&packed[..]).unwrap(), data);
    }

    #[test]
    fn test_pack_stream_abort() {
        let data = sample(CSTREAM_IN_SIZE * 3);
        let mut calls = 0;
        let err = pack_stream(
            &data[..],
            std::io::sink(),
            3,
            "x",
            progress_fn(|_: &str, _| {
                calls += 1;
                false
            }),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Aborted));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_pack_file_removes_partial_output_on_abort() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("input.bin");
        let dest = dir.path().join("input.bin.zst");
        std::fs::write(&src, sample(10_000)).unwrap();

        let err = pack_file(&src, &dest, 3, progress_fn(|_: &str, _| false)).unwrap_err();
        assert!(err.is_cancellation());
        assert!(!dest.exists());

        pack_file(&src, &dest, 3, NoProgress).unwrap();
        let packed = std::fs::read(&dest).unwrap();
        assert_eq!(zstd::decode_all(&packed[..]).unwrap(), sample(10_000));
    }

    #[test]
    fn test_pack_file_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = pack_file(
            dir.path().join("missing"),
            dir.path().join("out.zst"),
            3,
            NoProgress,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_memory_packer() {
        let data = sample(20_000);
        let mut packer = MemoryPacker::new(3).unwrap();
        let mut out = [0u8; 100];
        let mut frame = Vec::new();

        let mut input = &data[..];
        while !input.is_empty() {
            let step = packer.pack(&input[..input.len().min(333)], &mut out).unwrap();
            assert_eq!(step.status, MemPackStatus::Ok);
            frame.extend_from_slice(&out[..step.written]);
            input = &input[step.taken..];
        }
        loop {
            let step = packer.pack(&[], &mut out).unwrap();
            frame.extend_from_slice(&out[..step.written]);
            if step.status == MemPackStatus::Done {
                break;
            }
        }
        assert_eq!(packer.stats().bytes_in, data.len() as u64);
        assert_eq!(packer.stats().bytes_out, frame.len() as u64);
        assert_eq!(zstd::decode_all(&frame[..]).unwrap(), data);
    }
}
