//! Packed DOS date/time stamps.
//!
//! The host displays entry times as a single 32-bit value laid out like the
//! classic DOS date/time pair:
//!
//! ```text
//! bits 31..25  year - 1980
//! bits 24..21  month (1-12)
//! bits 20..16  day (1-31)
//! bits 15..11  hour (0-23)
//! bits 10..5   minute (0-59)
//! bits  4..0   second / 2
//! ```
//!
//! Seconds are stored halved, so odd seconds round down on the way in.
//!
//! # Example
//!
//! ```rust
//! use zstarc::DosTimestamp;
//!
//! let ts = DosTimestamp::from_parts(2021, 6, 15, 13, 45, 30);
//! assert_eq!(ts.year(), 2021);
//! assert_eq!(ts.second(), 30);
//! ```

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Local, Timelike};
use filetime::FileTime;

/// First year representable in the packed layout.
pub const DOS_EPOCH_YEAR: u32 = 1980;

/// Last year representable in the packed layout (7 bits of year offset).
pub const DOS_MAX_YEAR: u32 = DOS_EPOCH_YEAR + 0x7F;

/// A packed DOS date/time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DosTimestamp(u32);

impl DosTimestamp {
    /// Packs calendar components.
    ///
    /// Years before 1980 collapse to 1980-01-01 00:00:00 and years after
    /// 2107 to 2107-12-31 23:59:58, the two ends of the representable range.
    /// Other components are masked to their bit widths.
    pub fn from_parts(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        if year < DOS_EPOCH_YEAR {
            return Self::pack(DOS_EPOCH_YEAR, 1, 1, 0, 0, 0);
        }
        if year > DOS_MAX_YEAR {
            return Self::pack(DOS_MAX_YEAR, 12, 31, 23, 59, 58);
        }
        Self::pack(year, month, day, hour, minute, second)
    }

    fn pack(year: u32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self(
            ((year - DOS_EPOCH_YEAR) & 0x7F) << 25
                | (month & 0x0F) << 21
                | (day & 0x1F) << 16
                | (hour & 0x1F) << 11
                | (minute & 0x3F) << 5
                | (second / 2) & 0x1F,
        )
    }

    /// Wraps an already packed value.
    #[inline]
    pub const fn from_u32(raw: u32) -> Self {
        Self(raw)
    }

    /// Packs a point in time, expressed in the local time zone.
    pub fn from_system_time_local(time: SystemTime) -> Self {
        let local: DateTime<Local> = time.into();
        Self::from_parts(
            u32::try_from(local.year()).unwrap_or(0),
            local.month(),
            local.day(),
            local.hour(),
            local.minute(),
            local.second(),
        )
    }

    /// Packs the modification time of a file, in local time.
    pub fn from_file_mtime(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let mtime = FileTime::from_last_modification_time(&metadata);
        Ok(Self::from_system_time_local(filetime_to_system_time(mtime)))
    }

    /// Returns the raw packed value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Calendar year (1980-2107).
    pub const fn year(self) -> u32 {
        (self.0 >> 25) + DOS_EPOCH_YEAR
    }

    /// Month (1-12).
    pub const fn month(self) -> u32 {
        (self.0 >> 21) & 0x0F
    }

    /// Day of month (1-31).
    pub const fn day(self) -> u32 {
        (self.0 >> 16) & 0x1F
    }

    /// Hour (0-23).
    pub const fn hour(self) -> u32 {
        (self.0 >> 11) & 0x1F
    }

    /// Minute (0-59).
    pub const fn minute(self) -> u32 {
        (self.0 >> 5) & 0x3F
    }

    /// Second (0-58, always even).
    pub const fn second(self) -> u32 {
        (self.0 & 0x1F) * 2
    }
}

impl From<DosTimestamp> for u32 {
    fn from(ts: DosTimestamp) -> u32 {
        ts.0
    }
}

impl std::fmt::Display for DosTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

fn filetime_to_system_time(ft: FileTime) -> SystemTime {
    let secs = ft.unix_seconds();
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs.unsigned_abs(), ft.nanoseconds())
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(ft.nanoseconds().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_layout() {
        let ts = DosTimestamp::from_parts(2021, 6, 15, 13, 45, 30);
        let expected = (41u32 << 25) | (6 << 21) | (15 << 16) | (13 << 11) | (45 << 5) | 15;
        assert_eq!(ts.as_u32(), expected);

        assert_eq!(ts.year(), 2021);
        assert_eq!(ts.month(), 6);
        assert_eq!(ts.day(), 15);
        assert_eq!(ts.hour(), 13);
        assert_eq!(ts.minute(), 45);
        assert_eq!(ts.second(), 30);
    }

    #[test]
    fn test_odd_seconds_round_down() {
        let ts = DosTimestamp::from_parts(2000, 1, 1, 0, 0, 59);
        assert_eq!(ts.second(), 58);
    }

    #[test]
    fn test_epoch_and_clamping() {
        assert_eq!(DosTimestamp::from_parts(1980, 1, 1, 0, 0, 0).as_u32(), (1 << 21) | (1 << 16));
        assert_eq!(
            DosTimestamp::from_parts(1970, 5, 5, 5, 5, 5),
            DosTimestamp::from_parts(1980, 1, 1, 0, 0, 0)
        );
        let late = DosTimestamp::from_parts(2200, 1, 1, 0, 0, 0);
        assert_eq!(late.year(), DOS_MAX_YEAR);
        assert_eq!(late.month(), 12);
        assert_eq!(late.second(), 58);
    }

    #[test]
    fn test_display() {
        let ts = DosTimestamp::from_parts(2021, 6, 15, 13, 45, 30);
        assert_eq!(ts.to_string(), "2021-06-15 13:45:30");
    }

    #[test]
    fn test_from_system_time_matches_local_calendar() {
        let time = UNIX_EPOCH + Duration::from_secs(1_623_764_730);
        let local: DateTime<Local> = time.into();
        let ts = DosTimestamp::from_system_time_local(time);
        assert_eq!(ts.year(), local.year() as u32);
        assert_eq!(ts.month(), local.month());
        assert_eq!(ts.day(), local.day());
        assert_eq!(ts.hour(), local.hour());
        assert_eq!(ts.minute(), local.minute());
        assert_eq!(ts.second(), local.second() / 2 * 2);
    }

    #[test]
    fn test_from_file_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.zst");
        std::fs::write(&path, b"x").unwrap();
        let secs = 1_623_764_730;
        filetime::set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();

        let ts = DosTimestamp::from_file_mtime(&path).unwrap();
        let expected =
            DosTimestamp::from_system_time_local(UNIX_EPOCH + Duration::from_secs(secs as u64));
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_filetime_before_epoch() {
        let t = filetime_to_system_time(FileTime::from_unix_time(-10, 500));
        assert_eq!(
            UNIX_EPOCH.duration_since(t).unwrap(),
            Duration::from_secs(10) - Duration::from_nanos(500)
        );
    }
}
