//! Display metadata for a single-entry archive.
//!
//! An [`ArchiveIdentity`] turns the path of one compressed file into what the
//! host lists: the archive's own name, the name of the one file it contains,
//! both sizes and the modification time. Everything is derived lazily and
//! cached for the lifetime of the open archive.

use std::cell::OnceCell;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::codec::{FRAME_HEADER_SIZE_MAX, frame_content_size};
use crate::read_ahead::read_full;
use crate::timestamp::DosTimestamp;
use crate::{Error, Result};

/// Suffix marking a compressed file.
const CODEC_SUFFIX: &str = "zst";

/// Suffix marking a compressed tar stream.
const TAR_CODEC_SUFFIX: &str = "tzst";

/// Returns the last component of `path`, splitting on `/` and `\`.
///
/// ```rust
/// use zstarc::identity::archive_name;
///
/// assert_eq!(archive_name("C:\\data\\logs.zst"), "logs.zst");
/// assert_eq!(archive_name("plain.zst"), "plain.zst");
/// ```
pub fn archive_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(sep) => &path[sep + 1..],
        None => path,
    }
}

/// Derives the name of the file stored inside a compressed file.
///
/// The codec suffix is looked up case-insensitively anywhere from the last
/// `.` of the path onward:
///
/// - `tzst` found: the suffix becomes `.tar` (`backup.tzst` → `backup.tar`)
/// - `zst` found: the suffix is dropped (`notes.txt.zst` → `notes.txt`)
/// - otherwise the file name is returned unchanged
///
/// This is a substring match, not an exact extension match, so `a.zstuff`
/// also yields `a`.
///
/// ```rust
/// use zstarc::identity::contained_name;
///
/// assert_eq!(contained_name("dir/archive.tzst"), "archive.tar");
/// assert_eq!(contained_name("ARCHIVE.ZST"), "ARCHIVE");
/// assert_eq!(contained_name("README"), "README");
/// ```
pub fn contained_name(path: &str) -> String {
    let name = archive_name(path);
    let start = path.len() - name.len();
    let Some(dot) = path.rfind('.') else {
        return name.to_string();
    };

    let suffix = path[dot..].to_ascii_lowercase();
    let is_tar = suffix.contains(TAR_CODEC_SUFFIX);
    let is_compressed = is_tar || suffix.contains(CODEC_SUFFIX);

    if !is_compressed || dot < start {
        // The last dot belongs to a directory; the file name has no suffix.
        return name.to_string();
    }
    if is_tar {
        format!("{}tar", &path[start..=dot])
    } else {
        path[start..dot].to_string()
    }
}

/// The host's "read header" record for the single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderData {
    /// Name of the archive file itself.
    pub archive_name: String,
    /// Name of the contained file.
    pub file_name: String,
    /// Size of the compressed file.
    pub pack_size: u64,
    /// Declared decompressed size, if the frame header carries one.
    pub unpacked_size: Option<u64>,
    /// Archive modification time.
    pub file_time: DosTimestamp,
}

impl HeaderData {
    /// Unpacked size as the host expects it: `-1` when unknown.
    pub fn host_unpacked_size(&self) -> i64 {
        self.unpacked_size
            .and_then(|size| i64::try_from(size).ok())
            .unwrap_or(-1)
    }
}

/// Metadata of one physical compressed file.
///
/// The compressed size is taken when the identity is opened. The declared
/// size and the timestamp are read on first use and cached; none of the
/// values change for the lifetime of the identity.
#[derive(Debug)]
pub struct ArchiveIdentity {
    path: PathBuf,
    physical: String,
    compressed_size: u64,
    uncompressed_size: OnceCell<Option<u64>>,
    modified_time: OnceCell<DosTimestamp>,
}

impl ArchiveIdentity {
    /// Creates the identity of an existing file.
    ///
    /// Does not check that the file is actually compressed; see
    /// [`codec::verify_magic`](crate::codec::verify_magic) for that.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| Error::open_failed(path, e))?;
        if !metadata.is_file() {
            return Err(Error::NotFound {
                path: path.display().to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            physical: path.to_string_lossy().into_owned(),
            compressed_size: metadata.len(),
            uncompressed_size: OnceCell::new(),
            modified_time: OnceCell::new(),
        })
    }

    /// The path this identity was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the archive file.
    pub fn archive_display_name(&self) -> &str {
        archive_name(&self.physical)
    }

    /// Name of the file inside the archive.
    pub fn contained_display_name(&self) -> String {
        contained_name(&self.physical)
    }

    /// Size of the compressed file in bytes.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Decompressed size declared by the frame header.
    ///
    /// `None` when the frame does not declare it or the header is unreadable;
    /// `Some(0)` only for a frame that declares an empty payload.
    pub fn uncompressed_size(&self) -> Option<u64> {
        *self.uncompressed_size.get_or_init(|| self.read_content_size())
    }

    fn read_content_size(&self) -> Option<u64> {
        let mut header = [0u8; FRAME_HEADER_SIZE_MAX];
        let len = match File::open(&self.path).and_then(|mut f| read_full(&mut f, &mut header)) {
            Ok(len) => len,
            Err(e) => {
                log::warn!("reading frame header of '{}' failed: {}", self.path.display(), e);
                return None;
            }
        };
        frame_content_size(&header[..len])
    }

    /// Modification time of the archive, in local time.
    pub fn modified_time(&self) -> DosTimestamp {
        *self.modified_time.get_or_init(|| {
            DosTimestamp::from_file_mtime(&self.path).unwrap_or_else(|e| {
                log::warn!("mtime of '{}' unavailable: {}", self.path.display(), e);
                DosTimestamp::from_parts(1980, 1, 1, 0, 0, 0)
            })
        })
    }

    /// Builds the record returned by the host's "read header".
    pub fn header(&self) -> HeaderData {
        HeaderData {
            archive_name: self.archive_display_name().to_string(),
            file_name: self.contained_display_name(),
            pack_size: self.compressed_size(),
            unpacked_size: self.uncompressed_size(),
            file_time: self.modified_time(),
        }
    }
}
