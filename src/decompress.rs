//! Double-buffered decompression.
//!
//! A [`DecompressionSession`] pairs a [`ReadAhead`] source with a zstd
//! decoder. While the decoder works through the segment that was just read,
//! the next segment is already being fetched, so disk latency and CPU work
//! overlap by one level.
//!
//! ```text
//!  open()           issue(read 0)                      Priming
//!  unpack()  ┬──▶   wait(read k) ─▶ merge ─▶ issue(read k+1) ─▶ decode ─┐
//!            └──────────────────────────────────────────────────────────┘
//!                   (until a short read)                       Draining → Eof
//! ```
//!
//! Bytes of an in-flight read are never visible to the decoder: the buffer is
//! owned by the read until [`ReadAhead::wait`] hands it back, and only then is
//! it merged into the [`InputWindow`] behind the carried-over tail.
//!
//! # Example
//!
//! ```rust
//! use zstarc::DecompressionSession;
//!
//! let compressed = zstd::encode_all(&b"hello"[..], 3).unwrap();
//! let mut session = DecompressionSession::from_reader(std::io::Cursor::new(compressed)).unwrap();
//! let mut out = Vec::new();
//! let total = session.unpack(&mut out, |_| true).unwrap();
//! assert_eq!(total, 5);
//! assert_eq!(out, b"hello");
//! ```

use std::cell::OnceCell;
use std::io::{self, Read, Write};
use std::path::Path;

use zstd::stream::raw::{Decoder, Operation};

use crate::codec::{self, DSTREAM_OUT_SIZE, READ_SEGMENT_SIZE, alloc_buffer};
use crate::read_ahead::{BlockingReader, ReadAhead, ThreadedFileReader};
use crate::window::InputWindow;
use crate::{Error, Result};

/// Lifecycle of a decompression session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, no read issued yet.
    Idle,
    /// The first read is in flight.
    Priming,
    /// Decoding, with the next read in flight.
    Draining,
    /// The source is exhausted; decoding from buffered input only.
    Eof,
}

/// Buffer sizing for a decompression session.
///
/// The defaults match the codec's recommended stream sizes. Smaller values
/// are useful for exercising segment boundaries.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    segment_size: usize,
    output_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            segment_size: READ_SEGMENT_SIZE,
            output_size: DSTREAM_OUT_SIZE,
        }
    }
}

impl SessionOptions {
    /// Creates options with default sizes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size of each read-ahead segment (minimum 1).
    pub fn segment_size(mut self, size: usize) -> Self {
        self.segment_size = size.max(1);
        self
    }

    /// Sets the size of the decoder's output buffer (minimum 1).
    pub fn output_size(mut self, size: usize) -> Self {
        self.output_size = size.max(1);
        self
    }

    /// `(segment_size, output_size)`.
    pub(crate) fn sizes(&self) -> (usize, usize) {
        (self.segment_size, self.output_size)
    }
}

/// Outcome of one decoder step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step {
    /// Bytes written to the output buffer by this step.
    pub produced: usize,
    /// The decoder cannot progress until more input is merged.
    pub need_input: bool,
}

/// Decoder state shared by the blocking and async sessions.
pub(crate) struct FrameDecoder {
    inner: Decoder<'static>,
    out: Vec<u8>,
    mid_frame: bool,
    frames: u64,
    total: u64,
}

impl FrameDecoder {
    pub(crate) fn new(output_size: usize) -> Result<Self> {
        let out = alloc_buffer(output_size)?;
        let inner = Decoder::new().map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Self {
            inner,
            out,
            mid_frame: false,
            frames: 0,
            total: 0,
        })
    }

    /// Runs one decode step over the window's pending bytes.
    ///
    /// Consumed input is removed from the window. A step that fills the whole
    /// output buffer never asks for input, so buffered output is drained
    /// before the next read is awaited.
    pub(crate) fn step(&mut self, window: &mut InputWindow) -> Result<Step> {
        if window.is_drained() && !self.mid_frame {
            return Ok(Step {
                produced: 0,
                need_input: true,
            });
        }

        let status = self
            .inner
            .run_on_buffers(window.pending(), &mut self.out)
            .map_err(|e| Error::bad_archive(e.to_string()))?;
        window.consume(status.bytes_read);
        let produced = status.bytes_written;
        self.total += produced as u64;

        let need_input = if status.remaining == 0 {
            // Frame complete; a following frame starts from a clean context.
            self.frames += 1;
            self.mid_frame = false;
            self.inner
                .reinit()
                .map_err(|e| Error::bad_archive(e.to_string()))?;
            window.is_drained()
        } else {
            if status.bytes_read > 0 || produced > 0 {
                self.mid_frame = true;
            }
            if produced == self.out.len() {
                false
            } else if status.bytes_read == 0 && produced == 0 {
                true
            } else {
                window.is_drained()
            }
        };

        Ok(Step {
            produced,
            need_input,
        })
    }

    /// The first `n` bytes of the output buffer.
    pub(crate) fn output(&self, n: usize) -> &[u8] {
        &self.out[..n]
    }

    /// Checks that the stream ended cleanly and returns the decoded total.
    pub(crate) fn finish(&self, window: &InputWindow) -> Result<u64> {
        if self.mid_frame {
            return Err(Error::bad_archive("truncated frame"));
        }
        if self.frames == 0 {
            return Err(Error::bad_archive("no zstd frame found"));
        }
        if !window.is_drained() {
            return Err(Error::bad_archive(format!(
                "{} undecodable trailing bytes",
                window.pending_len()
            )));
        }
        Ok(self.total)
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("mid_frame", &self.mid_frame)
            .field("frames", &self.frames)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

/// Streaming decompressor for one archive.
///
/// Created on archive open, which also issues the first read. A session
/// unpacks at most once; any error or a completed unpack leaves it spent.
#[derive(Debug)]
pub struct DecompressionSession<R: ReadAhead = ThreadedFileReader> {
    reader: R,
    window: InputWindow,
    spare: Option<Vec<u8>>,
    decoder: FrameDecoder,
    state: SessionState,
    consumed: bool,
    deferred: Option<Error>,
    uncompressed_size: OnceCell<Option<u64>>,
}

impl DecompressionSession<ThreadedFileReader> {
    /// Opens a compressed file and primes the first read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening '{}' for decompression", path.display());
        Self::new(ThreadedFileReader::open(path)?)
    }
}

impl<T: Read> DecompressionSession<BlockingReader<T>> {
    /// Decompresses from any reader, reading on demand.
    pub fn from_reader(reader: T) -> Result<Self> {
        Self::new(BlockingReader::new(reader))
    }
}

impl<R: ReadAhead> DecompressionSession<R> {
    /// Creates a session over a read-ahead source with default buffer sizes.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, SessionOptions::default())
    }

    /// Creates a session with explicit buffer sizes.
    ///
    /// Buffers are reserved up front; allocation failure is reported as
    /// [`Error::OutOfMemory`].
    pub fn with_options(reader: R, options: SessionOptions) -> Result<Self> {
        let (segment_size, output_size) = options.sizes();
        let window = InputWindow::with_capacity(2 * segment_size)?;
        let spare = alloc_buffer(segment_size)?;
        let decoder = FrameDecoder::new(output_size)?;

        let mut session = Self {
            reader,
            window,
            spare: Some(spare),
            decoder,
            state: SessionState::Idle,
            consumed: false,
            deferred: None,
            uncompressed_size: OnceCell::new(),
        };
        session.issue_read()?;
        session.state = SessionState::Priming;
        log::debug!("decompression session primed");
        Ok(session)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bytes decoded so far.
    pub fn total_out(&self) -> u64 {
        self.decoder.total()
    }

    /// Decoded size declared by the frame header, if any.
    ///
    /// The first call may complete the priming read and merge it into the
    /// window (without decoding) so the header can be inspected. The result
    /// is a hint: it is computed once and never revised, even if decoding
    /// later produces a different length. If decoding has already started
    /// when this is first called, the header is gone and `None` is cached.
    pub fn uncompressed_size(&mut self) -> Option<u64> {
        if let Some(size) = self.uncompressed_size.get() {
            return *size;
        }
        let size = self.peek_content_size();
        *self.uncompressed_size.get_or_init(|| size)
    }

    fn peek_content_size(&mut self) -> Option<u64> {
        if self.consumed || self.decoder.total() > 0 || self.decoder.frames() > 0 {
            log::debug!("content size requested after decoding started");
            return None;
        }
        if self.state == SessionState::Priming {
            if let Err(e) = self.await_and_merge() {
                log::warn!("reading frame header failed: {}", e);
                self.deferred = Some(e);
                return None;
            }
        }
        let size = codec::frame_content_size(self.window.pending());
        if size.is_none() {
            log::debug!("frame header does not declare a content size");
        }
        size
    }

    /// Decodes the whole stream into `sink`.
    ///
    /// `progress` is called with the size of every decoded chunk after it has
    /// been written; returning `false` stops with [`Error::Aborted`] before
    /// anything else is written. Returns the total number of decoded bytes.
    ///
    /// The session is spent afterwards, whether this succeeded or not.
    pub fn unpack<W, P>(&mut self, sink: &mut W, mut progress: P) -> Result<u64>
    where
        W: Write + ?Sized,
        P: FnMut(usize) -> bool,
    {
        if self.consumed {
            return Err(Error::Codec("session already consumed".into()));
        }
        self.consumed = true;
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }

        let result = self.run(sink, &mut progress);
        match &result {
            Ok(total) => log::debug!(
                "unpacked {} bytes from {} frame(s)",
                total,
                self.decoder.frames()
            ),
            Err(e) => log::debug!("unpack stopped: {}", e),
        }
        result
    }

    /// Decodes the whole stream and discards the output.
    ///
    /// Used to verify an archive without extracting it.
    pub fn test<P>(&mut self, progress: P) -> Result<u64>
    where
        P: FnMut(usize) -> bool,
    {
        self.unpack(&mut io::sink(), progress)
    }

    fn run<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        progress: &mut dyn FnMut(usize) -> bool,
    ) -> Result<u64> {
        if self.state == SessionState::Priming {
            self.await_and_merge()?;
        }
        loop {
            self.drain(sink, progress)?;
            if self.state == SessionState::Eof {
                break;
            }
            self.await_and_merge()?;
        }
        self.decoder.finish(&self.window)
    }

    fn drain<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        progress: &mut dyn FnMut(usize) -> bool,
    ) -> Result<()> {
        loop {
            let step = self.decoder.step(&mut self.window)?;
            if step.produced > 0 {
                sink.write_all(self.decoder.output(step.produced))
                    .map_err(Error::WriteFailed)?;
                log::trace!("decoded chunk of {} bytes", step.produced);
                if !progress(step.produced) {
                    return Err(Error::Aborted);
                }
            }
            if step.need_input {
                return Ok(());
            }
        }
    }

    fn issue_read(&mut self) -> Result<()> {
        let buf = self
            .spare
            .take()
            .ok_or_else(|| Error::ReadFailed(io::Error::other("no free read segment")))?;
        self.reader.issue(buf)
    }

    /// Awaits the outstanding read, merges it behind the carried tail, and
    /// issues the next read unless the source is exhausted.
    fn await_and_merge(&mut self) -> Result<()> {
        let completion = self.reader.wait()?;
        let carried = self.window.carry_and_append(completion.data());
        log::trace!(
            "read {} bytes, carried {}, eof={}",
            completion.len,
            carried,
            completion.eof
        );
        let eof = completion.eof;
        self.spare = Some(completion.buf);

        if eof {
            log::debug!("end of compressed input");
            self.state = SessionState::Eof;
        } else {
            self.state = SessionState::Draining;
            self.issue_read()?;
        }
        Ok(())
    }
}
