//! Async decompression on Tokio.
//!
//! [`AsyncDecompressionSession`] runs the same double-buffered algorithm as
//! [`DecompressionSession`](crate::DecompressionSession), with the read-ahead
//! as a spawned Tokio task. The task owns both the source and the back
//! buffer while it runs and hands them back when awaited, so at most one read
//! is ever outstanding and its bytes stay out of reach until merged.
//!
//! # Example
//!
//! ```rust,no_run
//! use zstarc::async_unpack::AsyncDecompressionSession;
//!
//! #[tokio::main]
//! async fn main() -> zstarc::Result<()> {
//!     let mut session = AsyncDecompressionSession::open("data.zst").await?;
//!     let mut out = tokio::fs::File::create("data").await?;
//!     let total = session.unpack(&mut out, |_| true).await?;
//!     println!("{} bytes", total);
//!     Ok(())
//! }
//! ```

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::codec::{self, alloc_buffer};
use crate::decompress::{FrameDecoder, SessionOptions, SessionState};
use crate::window::InputWindow;
use crate::{Error, Result};

type ReadTask<R> = JoinHandle<io::Result<(R, Vec<u8>, usize)>>;

async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Async streaming decompressor for one archive.
pub struct AsyncDecompressionSession<R = File> {
    source: Option<R>,
    in_flight: Option<ReadTask<R>>,
    spare: Option<Vec<u8>>,
    window: InputWindow,
    decoder: FrameDecoder,
    state: SessionState,
    consumed: bool,
    deferred: Option<Error>,
    uncompressed_size: Option<Option<u64>>,
}

impl<R> std::fmt::Debug for AsyncDecompressionSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDecompressionSession")
            .field("state", &self.state)
            .field("read_in_flight", &self.in_flight.is_some())
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl AsyncDecompressionSession<File> {
    /// Opens a compressed file and primes the first read.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .map_err(|e| Error::open_failed(path, e))?;
        log::debug!("opening '{}' for async decompression", path.display());
        Self::new(file)
    }
}

impl<R> AsyncDecompressionSession<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Creates a session over an async source with default buffer sizes.
    ///
    /// Must be called from within a Tokio runtime; otherwise the priming
    /// read cannot be spawned and [`Error::ReadFailed`] is returned.
    pub fn new(source: R) -> Result<Self> {
        Self::with_options(source, SessionOptions::default())
    }

    /// Creates a session with explicit buffer sizes.
    pub fn with_options(source: R, options: SessionOptions) -> Result<Self> {
        let (segment_size, output_size) = options.sizes();
        let mut session = Self {
            source: Some(source),
            in_flight: None,
            spare: Some(alloc_buffer(segment_size)?),
            window: InputWindow::with_capacity(2 * segment_size)?,
            decoder: FrameDecoder::new(output_size)?,
            state: SessionState::Idle,
            consumed: false,
            deferred: None,
            uncompressed_size: None,
        };
        session.issue_read()?;
        session.state = SessionState::Priming;
        log::debug!("async decompression session primed");
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
    /// Same contract as the blocking session: computed once, a hint only.
    pub async fn uncompressed_size(&mut self) -> Option<u64> {
        if let Some(size) = self.uncompressed_size {
            return size;
        }
        let size = self.peek_content_size().await;
        self.uncompressed_size = Some(size);
        size
    }

    async fn peek_content_size(&mut self) -> Option<u64> {
        if self.consumed || self.decoder.total() > 0 || self.decoder.frames() > 0 {
            return None;
        }
        if self.state == SessionState::Priming {
            if let Err(e) = self.await_and_merge().await {
                log::warn!("reading frame header failed: {}", e);
                self.deferred = Some(e);
                return None;
            }
        }
        codec::frame_content_size(self.window.pending())
    }

    /// Decodes the whole stream into `sink`.
    ///
    /// See [`DecompressionSession::unpack`](crate::DecompressionSession::unpack).
    pub async fn unpack<W, P>(&mut self, sink: &mut W, mut progress: P) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
        P: FnMut(usize) -> bool,
    {
        if self.consumed {
            return Err(Error::Codec("session already consumed".into()));
        }
        self.consumed = true;
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }

        if self.state == SessionState::Priming {
            self.await_and_merge().await?;
        }
        loop {
            self.drain(sink, &mut progress).await?;
            if self.state == SessionState::Eof {
                break;
            }
            self.await_and_merge().await?;
        }
        sink.flush().await.map_err(Error::WriteFailed)?;

        let total = self.decoder.finish(&self.window)?;
        log::debug!("async unpack finished: {} bytes", total);
        Ok(total)
    }

    /// Decodes the whole stream and discards the output.
    pub async fn test<P>(&mut self, progress: P) -> Result<u64>
    where
        P: FnMut(usize) -> bool,
    {
        self.unpack(&mut tokio::io::sink(), progress).await
    }

    async fn drain<W, P>(&mut self, sink: &mut W, progress: &mut P) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
        P: FnMut(usize) -> bool,
    {
        loop {
            let step = self.decoder.step(&mut self.window)?;
            if step.produced > 0 {
                sink.write_all(self.decoder.output(step.produced))
                    .await
                    .map_err(Error::WriteFailed)?;
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
        let runtime = Handle::try_current()
            .map_err(|e| Error::ReadFailed(io::Error::other(e.to_string())))?;
        let (mut source, mut buf) = match (self.source.take(), self.spare.take()) {
            (Some(source), Some(buf)) => (source, buf),
            _ => return Err(Error::ReadFailed(io::Error::other("read already in flight"))),
        };
        self.in_flight = Some(runtime.spawn(async move {
            let n = read_full(&mut source, &mut buf).await?;
            Ok((source, buf, n))
        }));
        Ok(())
    }

    async fn await_and_merge(&mut self) -> Result<()> {
        let task = self
            .in_flight
            .take()
            .ok_or_else(|| Error::ReadFailed(io::Error::other("no read in flight")))?;
        let (source, buf, len) = task
            .await
            .map_err(|e| Error::ReadFailed(io::Error::other(e.to_string())))?
            .map_err(Error::ReadFailed)?;

        let carried = self.window.carry_and_append(&buf[..len]);
        log::trace!("read {} bytes, carried {}", len, carried);
        let eof = len < buf.len() || len == 0;
        self.source = Some(source);
        self.spare = Some(buf);

        if eof {
            self.state = SessionState::Eof;
        } else {
            self.state = SessionState::Draining;
            self.issue_read()?;
        }
        Ok(())
    }
}

impl<R> Drop for AsyncDecompressionSession<R> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            log::debug!("aborting pending async read");
            task.abort();
        }
    }
}
