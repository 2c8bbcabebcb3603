//! File-manager host facade.
//!
//! The host sees every compressed file as an archive holding exactly one
//! entry. Listing and extraction go through an [`ArchiveHandle`]:
//!
//! ```text
//! open_archive ─▶ read_header ─▶ process_file(Skip | Test | Extract) ─▶ close
//!                     │
//!                     └─▶ read_header again ─▶ Error::EndOfArchive
//! ```
//!
//! Packing is stateless ([`pack_files`]) or buffer driven
//! ([`start_mem_pack`]). Progress goes to the handle's own callback if one
//! was set, otherwise to the callback registered process-wide through
//! [`set_global_process_data_proc`].
//!
//! # Example
//!
//! ```rust,no_run
//! use zstarc::host::{self, OpenMode, Operation};
//!
//! let mut handle = host::open_archive("logs.tar.zst", OpenMode::Extract)?;
//! let header = handle.read_header()?;
//! handle.process_file(Operation::Extract {
//!     dest_path: Some("out".into()),
//!     dest_name: header.file_name.into(),
//! })?;
//! handle.close();
//! # Ok::<(), zstarc::Error>(())
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};

use crate::compress::{MemoryPacker, PackStats, pack_file};
use crate::config::Configuration;
use crate::decompress::DecompressionSession;
use crate::identity::{ArchiveIdentity, HeaderData};
use crate::progress::{NoProgress, ProcessDataProc, ProcessDataSlot};
use crate::{Error, Result, codec};

/// Why the host opened the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Only headers will be read.
    List,
    /// Entries will be tested or extracted.
    Extract,
}

/// What to do with the current entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Move on without decoding.
    Skip,
    /// Decode and discard, verifying the stream.
    Test,
    /// Decode into `dest_path/dest_name`, or `dest_name` alone.
    Extract {
        /// Directory to extract into, if the host supplies it separately.
        dest_path: Option<PathBuf>,
        /// File name, or full path when `dest_path` is `None`.
        dest_name: PathBuf,
    },
}

/// An open single-entry archive.
///
/// Dropping the handle closes it: any read still in flight is discarded,
/// and closing the last open handle clears the process-wide callback.
pub struct ArchiveHandle {
    identity: ArchiveIdentity,
    session: DecompressionSession,
    mode: OpenMode,
    header_shown: bool,
    process_data: Option<ProcessDataProc>,
}

/// Opens `path` as a one-entry archive and primes the first read.
pub fn open_archive(path: impl AsRef<Path>, mode: OpenMode) -> Result<ArchiveHandle> {
    let path = path.as_ref();
    let identity = ArchiveIdentity::open(path)?;
    let session = DecompressionSession::open(path)?;
    ProcessDataSlot::handle_opened();
    log::debug!("opened archive '{}' ({:?})", path.display(), mode);
    Ok(ArchiveHandle {
        identity,
        session,
        mode,
        header_shown: false,
        process_data: None,
    })
}

impl std::fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("identity", &self.identity)
            .field("mode", &self.mode)
            .field("header_shown", &self.header_shown)
            .field("has_process_data", &self.process_data.is_some())
            .finish_non_exhaustive()
    }
}

impl ArchiveHandle {
    /// Metadata of the archive file.
    pub fn identity(&self) -> &ArchiveIdentity {
        &self.identity
    }

    /// The mode the archive was opened with.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns the header of the single entry.
    ///
    /// The entry is reported once; the next call returns
    /// [`Error::EndOfArchive`].
    pub fn read_header(&mut self) -> Result<HeaderData> {
        if self.header_shown {
            return Err(Error::EndOfArchive);
        }
        self.header_shown = true;

        // The size comes from the session's primed buffer, not a second open.
        let header = HeaderData {
            archive_name: self.identity.archive_display_name().to_string(),
            file_name: self.identity.contained_display_name(),
            pack_size: self.identity.compressed_size(),
            unpacked_size: self.session.uncompressed_size(),
            file_time: self.identity.modified_time(),
        };
        log::debug!(
            "header: {} -> {} ({} packed, {:?} unpacked)",
            header.archive_name,
            header.file_name,
            header.pack_size,
            header.unpacked_size
        );
        Ok(header)
    }

    /// Sets a callback for this handle only, overriding the global one.
    pub fn set_process_data_proc(&mut self, callback: Option<ProcessDataProc>) {
        self.process_data = callback;
    }

    /// Skips, tests or extracts the entry.
    ///
    /// On a failed extraction the partially written file is removed.
    pub fn process_file(&mut self, operation: Operation) -> Result<u64> {
        let callback = self
            .process_data
            .clone()
            .or_else(ProcessDataSlot::take_for_session);
        let identifier = self.identity.path().display().to_string();
        let progress = |n: usize| callback.as_ref().is_none_or(|cb| cb(&identifier, n));

        match operation {
            Operation::Skip => {
                log::debug!("skipping '{}'", identifier);
                Ok(0)
            }
            Operation::Test => self.session.test(progress),
            Operation::Extract {
                dest_path,
                dest_name,
            } => {
                let dest = match dest_path {
                    Some(dir) => dir.join(dest_name),
                    None => dest_name,
                };
                log::debug!("extracting '{}' to '{}'", identifier, dest.display());
                let result = extract_to(&mut self.session, &dest, progress);
                if result.is_err() {
                    if let Err(e) = std::fs::remove_file(&dest) {
                        log::warn!("could not remove partial file '{}': {}", dest.display(), e);
                    }
                }
                result
            }
        }
    }

    /// Closes the archive.
    pub fn close(self) {
        log::debug!("closing archive '{}'", self.identity.path().display());
    }
}

fn extract_to<P>(session: &mut DecompressionSession, dest: &Path, progress: P) -> Result<u64>
where
    P: FnMut(usize) -> bool,
{
    let file = File::create(dest).map_err(Error::WriteFailed)?;
    let mut out = BufWriter::new(file);
    let total = session.unpack(&mut out, progress)?;
    out.flush().map_err(Error::WriteFailed)?;
    Ok(total)
}

impl Drop for ArchiveHandle {
    fn drop(&mut self) {
        ProcessDataSlot::handle_closed();
    }
}

/// Registers (or with `None`, clears) the process-wide progress callback.
///
/// The host may call this before any archive is open; the callback then
/// applies to every session started afterwards.
pub fn set_global_process_data_proc(callback: Option<ProcessDataProc>) {
    match callback {
        Some(callback) => ProcessDataSlot::register(callback),
        None => ProcessDataSlot::clear(),
    }
}

/// Options of a pack request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackFlags {
    /// Delete the source after packing it.
    pub move_files: bool,
    /// Keep directory names. A single stream stores no names, so this has
    /// no effect.
    pub save_paths: bool,
    /// Encrypt the archive. Not supported.
    pub encrypt: bool,
}

/// Packs the first file of `add_list` into `packed_file`.
///
/// File names in `add_list` are relative to `src_path`. Only one entry fits
/// in a compressed file, so further names are ignored.
pub fn pack_files<S: AsRef<str>>(
    packed_file: impl AsRef<Path>,
    src_path: Option<&Path>,
    add_list: &[S],
    flags: PackFlags,
    level: u32,
) -> Result<PackStats> {
    if flags.encrypt {
        return Err(Error::NotSupported {
            feature: "encryption",
        });
    }
    let name = add_list.first().ok_or(Error::NoFiles)?.as_ref();
    if add_list.len() > 1 {
        log::warn!("{} files requested, packing only '{}'", add_list.len(), name);
    }
    let src = match src_path {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    };
    let packed_file = packed_file.as_ref();
    log::debug!("packing '{}' into '{}'", src.display(), packed_file.display());

    let stats = match ProcessDataSlot::take_for_session() {
        Some(callback) => pack_file(&src, packed_file, level, callback)?,
        None => pack_file(&src, packed_file, level, NoProgress)?,
    };

    if flags.move_files {
        std::fs::remove_file(&src)?;
        log::debug!("removed source '{}'", src.display());
    }
    Ok(stats)
}

/// Starts a pack-to-buffer operation.
pub fn start_mem_pack(level: u32) -> Result<MemoryPacker> {
    MemoryPacker::new(level)
}

/// Returns `true` if `path` starts with a zstd frame.
pub fn can_handle_file(path: impl AsRef<Path>) -> bool {
    codec::verify_magic(path)
}

/// Loads (creating if needed) the packer configuration.
///
/// Uses [`Configuration::default_path`] when `path` is `None`.
pub fn configure_packer(path: Option<&Path>) -> Result<Configuration> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Configuration::default_path()?,
    };
    Configuration::load_or_create(path)
}

/// Capability bits reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PackerCaps(u32);

impl PackerCaps {
    /// Can create new archives.
    pub const NEW: Self = Self(1);
    /// Can modify existing archives.
    pub const MODIFY: Self = Self(2);
    /// Archives can hold multiple files.
    pub const MULTIPLE: Self = Self(4);
    /// Can delete files from archives.
    pub const DELETE: Self = Self(8);
    /// Has an options dialog.
    pub const OPTIONS: Self = Self(16);
    /// Supports packing in memory.
    pub const MEMPACK: Self = Self(32);
    /// Detects archives by content.
    pub const BY_CONTENT: Self = Self(64);
    /// Archives may be searched for text.
    pub const SEARCH_TEXT: Self = Self(128);
    /// Hide the packer in the host's pack dialog.
    pub const HIDE: Self = Self(256);
    /// Supports encryption.
    pub const ENCRYPT: Self = Self(512);

    /// Raw bit value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PackerCaps {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PackerCaps {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Capabilities of this packer.
pub fn packer_caps() -> PackerCaps {
    PackerCaps::NEW
        | PackerCaps::OPTIONS
        | PackerCaps::BY_CONTENT
        | PackerCaps::SEARCH_TEXT
        | PackerCaps::MEMPACK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packer_caps() {
        let caps = packer_caps();
        assert_eq!(caps.bits(), 1 | 16 | 64 | 128 | 32);
        assert!(caps.contains(PackerCaps::MEMPACK));
        assert!(!caps.contains(PackerCaps::MULTIPLE));
        assert!(!caps.contains(PackerCaps::ENCRYPT));
    }

    #[test]
    fn test_encrypt_not_supported() {
        let dir = tempfile::tempdir().unwrap();
        let flags = PackFlags {
            encrypt: true,
            ..Default::default()
        };
        let err = pack_files(dir.path().join("a.zst"), None, &["a"][..], flags, 3).unwrap_err();
        assert!(matches!(err, Error::NotSupported { .. }));
    }

    #[test]
    fn test_empty_add_list() {
        let dir = tempfile::tempdir().unwrap();
        let none: [&str; 0] = [];
        let err = pack_files(dir.path().join("a.zst"), None, &none[..], PackFlags::default(), 3)
            .unwrap_err();
        assert!(matches!(err, Error::NoFiles));
    }

    #[test]
    fn test_configure_packer_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zstarc.json");
        let config = configure_packer(Some(path.as_path())).unwrap();
        assert_eq!(config.compression_level, codec::default_level());
        assert!(path.exists());
    }
}
