//! Progress reporting and cancellation.
//!
//! Every pack and unpack operation reports the size of each chunk it has
//! processed together with an identifier (the file name the host shows).
//! Returning `false` from the callback cancels the operation at the next
//! chunk boundary.
//!
//! The host may register a callback before any archive handle exists. That
//! registration lives in [`ProcessDataSlot`], a process-wide piece of shared
//! configuration that sessions pick up when they start.
//!
//! # Example
//!
//! ```rust
//! use zstarc::progress::{ProgressReporter, progress_fn};
//!
//! let mut seen = 0;
//! let mut progress = progress_fn(|_name: &str, bytes| {
//!     seen += bytes;
//!     true
//! });
//! assert!(progress.on_chunk("data.bin", 4096));
//! drop(progress);
//! assert_eq!(seen, 4096);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

// Floating point versions for formatting calculations
const BYTES_KB: f64 = 1024.0;
const BYTES_MB: f64 = BYTES_KB * 1024.0;
const BYTES_GB: f64 = BYTES_MB * 1024.0;

/// Progress reporting for pack and unpack operations.
pub trait ProgressReporter: Send {
    /// Called after each processed chunk.
    ///
    /// `identifier` names the file being processed and `bytes` is the size
    /// of this chunk, not a running total. Returns `true` to continue or
    /// `false` to request cancellation.
    fn on_chunk(&mut self, identifier: &str, bytes: usize) -> bool {
        let _ = (identifier, bytes);
        true
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for &mut P {
    fn on_chunk(&mut self, identifier: &str, bytes: usize) -> bool {
        (**self).on_chunk(identifier, bytes)
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for Box<P> {
    fn on_chunk(&mut self, identifier: &str, bytes: usize) -> bool {
        (**self).on_chunk(identifier, bytes)
    }
}

/// A progress reporter that does nothing (null object pattern).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A progress reporter that calls a closure.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(&str, usize) -> bool + Send,
{
    /// Creates a progress reporter from a closure.
    ///
    /// The closure receives `(identifier, chunk_bytes)` and returns `true`
    /// to continue or `false` to cancel.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(&str, usize) -> bool + Send,
{
    fn on_chunk(&mut self, identifier: &str, bytes: usize) -> bool {
        (self.callback)(identifier, bytes)
    }
}

/// Creates a closure-based progress reporter.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(&str, usize) -> bool + Send,
{
    ClosureProgress::new(f)
}

/// The host's "process data" callback: shared, callable from any thread.
pub type ProcessDataProc = Arc<dyn Fn(&str, usize) -> bool + Send + Sync>;

impl ProgressReporter for ProcessDataProc {
    fn on_chunk(&mut self, identifier: &str, bytes: usize) -> bool {
        (**self)(identifier, bytes)
    }
}

/// A thread-safe progress reporter using atomics.
///
/// Allows progress to be monitored, and cancelled, from another thread.
#[derive(Debug)]
pub struct AtomicProgress {
    processed_bytes: AtomicU64,
    chunks: AtomicU64,
    cancelled: AtomicBool,
}

impl Default for AtomicProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgress {
    /// Creates a new atomic progress reporter.
    pub fn new() -> Self {
        Self {
            processed_bytes: AtomicU64::new(0),
            chunks: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Creates a shared atomic progress reporter.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the bytes processed so far.
    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Relaxed)
    }

    /// Returns the number of chunks reported.
    pub fn chunks(&self) -> u64 {
        self.chunks.load(Ordering::Relaxed)
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn record(&self, bytes: usize) -> bool {
        self.processed_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.chunks.fetch_add(1, Ordering::Relaxed);
        !self.is_cancelled()
    }
}

impl ProgressReporter for AtomicProgress {
    fn on_chunk(&mut self, _identifier: &str, bytes: usize) -> bool {
        self.record(bytes)
    }
}

/// Progress reporter for shared `Arc<AtomicProgress>`.
impl ProgressReporter for Arc<AtomicProgress> {
    fn on_chunk(&mut self, _identifier: &str, bytes: usize) -> bool {
        self.record(bytes)
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("process-data slot mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

#[derive(Default)]
struct SlotState {
    callback: Option<ProcessDataProc>,
    open_handles: usize,
}

fn slot() -> &'static Mutex<SlotState> {
    static SLOT: OnceLock<Mutex<SlotState>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(SlotState::default()))
}

/// Process-wide "process data" callback registration.
///
/// The host can deliver its progress callback before any archive handle has
/// been created. The callback is kept here as shared configuration: each
/// new session takes its own handle to it, and the registration is cleared
/// when the last open archive handle closes. A callback set directly on a
/// handle takes precedence over this one.
#[derive(Debug, Clone, Copy)]
pub struct ProcessDataSlot;

impl ProcessDataSlot {
    /// Registers the batch callback, replacing any previous one.
    pub fn register(callback: ProcessDataProc) {
        let mut state = lock_or_recover(slot());
        if state.callback.is_some() {
            log::debug!("replacing registered process-data callback");
        }
        state.callback = Some(callback);
    }

    /// Returns a handle to the registered callback for a new session.
    pub fn take_for_session() -> Option<ProcessDataProc> {
        lock_or_recover(slot()).callback.clone()
    }

    /// Removes the registered callback.
    pub fn clear() {
        lock_or_recover(slot()).callback = None;
    }

    /// Returns `true` if a callback is registered.
    pub fn is_set() -> bool {
        lock_or_recover(slot()).callback.is_some()
    }

    /// Number of archive handles currently open.
    pub fn open_handles() -> usize {
        lock_or_recover(slot()).open_handles
    }

    pub(crate) fn handle_opened() {
        lock_or_recover(slot()).open_handles += 1;
    }

    /// Records a closed handle; the last close ends the batch.
    pub(crate) fn handle_closed() {
        let mut state = lock_or_recover(slot());
        state.open_handles = state.open_handles.saturating_sub(1);
        if state.open_handles == 0 && state.callback.take().is_some() {
            log::debug!("last archive handle closed, process-data callback cleared");
        }
    }
}

/// Formats bytes as a human-readable string using IEC units (KiB, MiB, GiB).
///
/// # Examples
///
/// ```rust
/// use zstarc::progress::format_bytes_iec;
///
/// assert_eq!(format_bytes_iec(0), "0 B");
/// assert_eq!(format_bytes_iec(1024), "1.0 KiB");
/// assert_eq!(format_bytes_iec(1536), "1.5 KiB");
/// ```
pub fn format_bytes_iec(bytes: u64) -> String {
    let bytes_f64 = bytes as f64;
    if bytes_f64 < BYTES_KB {
        format!("{} B", bytes)
    } else if bytes_f64 < BYTES_MB {
        format!("{:.1} KiB", bytes_f64 / BYTES_KB)
    } else if bytes_f64 < BYTES_GB {
        format!("{:.1} MiB", bytes_f64 / BYTES_MB)
    } else {
        format!("{:.1} GiB", bytes_f64 / BYTES_GB)
    }
}
