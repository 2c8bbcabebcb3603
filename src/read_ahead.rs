//! Read-ahead sources for the decompression session.
//!
//! A [`ReadAhead`] source accepts at most one outstanding read at a time.
//! The caller moves a buffer into [`issue`](ReadAhead::issue) and gets it
//! back, filled, from [`wait`](ReadAhead::wait). Because the buffer is owned
//! by the in-flight read, nothing can touch those bytes until the read has
//! completed and been merged by the session.
//!
//! Implementations:
//!
//! - [`ThreadedFileReader`]: a helper thread owns the file and performs the
//!   blocking reads, so CPU work on the previous segment overlaps the next
//!   read.
//! - [`BlockingReader`]: performs the read inside `wait()`. No overlap, but
//!   no thread either; used for in-memory sources.
//! - [`ChunkedReader`]: like `BlockingReader`, but caps each read according
//!   to a schedule of chunk sizes to simulate different I/O timings.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use crate::{Error, Result};

/// The result of one completed read.
#[derive(Debug)]
pub struct ReadCompletion {
    /// The buffer that was issued, handed back to the caller.
    pub buf: Vec<u8>,
    /// Number of valid bytes at the start of `buf`.
    pub len: usize,
    /// The source reported end of input.
    pub eof: bool,
}

impl ReadCompletion {
    /// The bytes actually read.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// An asynchronous read capability: issue one read, later await its result.
pub trait ReadAhead {
    /// Starts a read into `buf`, filling as much of it as the source allows.
    ///
    /// Fails if a read is already in flight.
    fn issue(&mut self, buf: Vec<u8>) -> Result<()>;

    /// Waits for the outstanding read and returns its completion.
    ///
    /// This is the only place a session blocks on I/O. Fails if no read is
    /// in flight.
    fn wait(&mut self) -> Result<ReadCompletion>;

    /// Returns `true` while a read is in flight.
    fn is_pending(&self) -> bool;
}

fn already_in_flight() -> Error {
    Error::ReadFailed(io::Error::other("read already in flight"))
}

fn nothing_in_flight() -> Error {
    Error::ReadFailed(io::Error::other("no read in flight"))
}

/// Reads until `buf` is full or the source is exhausted.
///
/// A short count therefore always means end of input.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

fn completion(buf: Vec<u8>, len: usize, requested: usize) -> ReadCompletion {
    ReadCompletion {
        eof: len == 0 || len < requested,
        buf,
        len,
    }
}

type WorkerResult = io::Result<(Vec<u8>, usize)>;

/// File reader backed by one helper thread per session.
///
/// The thread owns the file and serves one request at a time. Dropping the
/// reader discards any pending completion and joins the thread.
pub struct ThreadedFileReader {
    requests: Option<Sender<Vec<u8>>>,
    completions: Receiver<WorkerResult>,
    worker: Option<JoinHandle<()>>,
    pending: bool,
}

impl std::fmt::Debug for ThreadedFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedFileReader")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl ThreadedFileReader {
    /// Opens a file for read-ahead.
    ///
    /// Returns [`Error::NotFound`] if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::open_failed(path, e))?;
        Self::spawn(file)
    }

    /// Starts a helper thread reading from `reader`.
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<Vec<u8>>();
        let (completion_tx, completion_rx) = mpsc::channel::<WorkerResult>();

        let worker = std::thread::Builder::new()
            .name("zstarc-read-ahead".into())
            .spawn(move || {
                let mut reader = reader;
                for mut buf in request_rx {
                    let result = read_full(&mut reader, &mut buf).map(|n| (buf, n));
                    if completion_tx.send(result).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            completions: completion_rx,
            worker: Some(worker),
            pending: false,
        })
    }
}

impl ReadAhead for ThreadedFileReader {
    fn issue(&mut self, buf: Vec<u8>) -> Result<()> {
        if self.pending {
            return Err(already_in_flight());
        }
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| Error::ReadFailed(io::Error::other("read-ahead worker stopped")))?;
        requests
            .send(buf)
            .map_err(|_| Error::ReadFailed(io::Error::other("read-ahead worker exited")))?;
        self.pending = true;
        Ok(())
    }

    fn wait(&mut self) -> Result<ReadCompletion> {
        if !self.pending {
            return Err(nothing_in_flight());
        }
        self.pending = false;
        match self.completions.recv() {
            Ok(Ok((buf, len))) => {
                let requested = buf.len();
                Ok(completion(buf, len, requested))
            }
            Ok(Err(e)) => Err(Error::ReadFailed(e)),
            Err(_) => Err(Error::ReadFailed(io::Error::other(
                "read-ahead worker exited",
            ))),
        }
    }

    fn is_pending(&self) -> bool {
        self.pending
    }
}

impl Drop for ThreadedFileReader {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if self.pending {
            log::debug!("discarding pending read-ahead completion");
            let _ = self.completions.recv();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("read-ahead worker panicked");
            }
        }
    }
}

/// Reader that performs the issued read when it is awaited.
#[derive(Debug)]
pub struct BlockingReader<R> {
    inner: R,
    pending: Option<Vec<u8>>,
}

impl<R: Read> BlockingReader<R> {
    /// Wraps a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: None,
        }
    }
}

impl<R: Read> ReadAhead for BlockingReader<R> {
    fn issue(&mut self, buf: Vec<u8>) -> Result<()> {
        if self.pending.is_some() {
            return Err(already_in_flight());
        }
        self.pending = Some(buf);
        Ok(())
    }

    fn wait(&mut self) -> Result<ReadCompletion> {
        let mut buf = self.pending.take().ok_or_else(nothing_in_flight)?;
        let len = read_full(&mut self.inner, &mut buf).map_err(Error::ReadFailed)?;
        let requested = buf.len();
        Ok(completion(buf, len, requested))
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Reader that caps each read by a cyclic schedule of chunk sizes.
///
/// A schedule of `[1, 7, 3]` makes successive reads return at most 1, 7, 3,
/// 1, 7, ... bytes. End of input is reported only when the source returns
/// fewer bytes than the current cap.
#[derive(Debug)]
pub struct ChunkedReader<R> {
    inner: R,
    schedule: Vec<usize>,
    next: usize,
    pending: Option<Vec<u8>>,
}

impl<R: Read> ChunkedReader<R> {
    /// Wraps a reader with a chunk schedule. Zero entries are treated as 1;
    /// an empty schedule means no cap.
    pub fn new(inner: R, schedule: impl Into<Vec<usize>>) -> Self {
        Self {
            inner,
            schedule: schedule.into().into_iter().map(|n| n.max(1)).collect(),
            next: 0,
            pending: None,
        }
    }

    fn next_cap(&mut self) -> Option<usize> {
        if self.schedule.is_empty() {
            return None;
        }
        let cap = self.schedule[self.next % self.schedule.len()];
        self.next += 1;
        Some(cap)
    }
}

impl<R: Read> ReadAhead for ChunkedReader<R> {
    fn issue(&mut self, buf: Vec<u8>) -> Result<()> {
        if self.pending.is_some() {
            return Err(already_in_flight());
        }
        self.pending = Some(buf);
        Ok(())
    }

    fn wait(&mut self) -> Result<ReadCompletion> {
        let mut buf = self.pending.take().ok_or_else(nothing_in_flight)?;
        let cap = self.next_cap().map_or(buf.len(), |c| c.min(buf.len()));
        let len = read_full(&mut self.inner, &mut buf[..cap]).map_err(Error::ReadFailed)?;
        Ok(completion(buf, len, cap))
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
