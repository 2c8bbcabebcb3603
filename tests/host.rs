//! Host protocol integration tests.
//!
//! These follow the sequence a file manager drives: open, read the header,
//! process the entry, close. None of them touch the process-wide callback;
//! that lives in `global_callback.rs`.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use zstarc::host::{self, OpenMode, Operation, PackFlags, PackerCaps};
use zstarc::{DecompressionSession, Error, ProcessDataProc};

mod common;

fn archive_on_disk(name: &str, data: &[u8]) -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = common::write_file(temp.path(), name, &common::pack_with_size(data, 3));
    (temp, path)
}

fn counting_callback() -> (ProcessDataProc, Arc<AtomicU64>) {
    let counter = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&counter);
    let callback: ProcessDataProc = Arc::new(move |_name: &str, bytes: usize| {
        seen.fetch_add(bytes as u64, Ordering::Relaxed);
        true
    });
    (callback, counter)
}

// =============================================================================
// List
// =============================================================================

#[test]
fn test_list_reports_single_entry() {
    let data = common::sample_data(12_345, 31);
    let (_temp, path) = archive_on_disk("report.csv.zst", &data);

    let mut handle = host::open_archive(&path, OpenMode::List).unwrap();
    let header = handle.read_header().unwrap();
    assert_eq!(header.archive_name, "report.csv.zst");
    assert_eq!(header.file_name, "report.csv");
    assert_eq!(header.unpacked_size, Some(12_345));
    assert_eq!(header.host_unpacked_size(), 12_345);
    assert_eq!(header.pack_size, std::fs::metadata(&path).unwrap().len());
    assert!(header.file_time.year() >= 1980);

    assert!(matches!(handle.read_header(), Err(Error::EndOfArchive)));
    handle.close();
}

#[test]
fn test_list_tzst_names_tar() {
    let (_temp, path) = archive_on_disk("backup.tzst", b"tar bytes");
    let mut handle = host::open_archive(&path, OpenMode::List).unwrap();
    assert_eq!(handle.read_header().unwrap().file_name, "backup.tar");
}

#[test]
fn test_list_streamed_archive_has_unknown_size() {
    let temp = TempDir::new().unwrap();
    let path = common::write_file(temp.path(), "s.zst", &common::pack(b"streamed", 3));

    let mut handle = host::open_archive(&path, OpenMode::List).unwrap();
    let header = handle.read_header().unwrap();
    assert_eq!(header.unpacked_size, None);
    assert_eq!(header.host_unpacked_size(), -1);
}

#[test]
fn test_open_missing_archive() {
    let temp = TempDir::new().unwrap();
    let err = host::open_archive(temp.path().join("nope.zst"), OpenMode::List).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(err.host_code(), zstarc::error::host_code::E_EOPEN);
}

// =============================================================================
// Process
// =============================================================================

#[test]
fn test_extract_to_directory() {
    let data = common::sample_data(250_000, 32);
    let (temp, path) = archive_on_disk("notes.txt.zst", &data);
    let out_dir = temp.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let mut handle = host::open_archive(&path, OpenMode::Extract).unwrap();
    let header = handle.read_header().unwrap();
    let (callback, counter) = counting_callback();
    handle.set_process_data_proc(Some(callback));

    let total = handle
        .process_file(Operation::Extract {
            dest_path: Some(out_dir.clone()),
            dest_name: PathBuf::from(&header.file_name),
        })
        .unwrap();
    handle.close();

    assert_eq!(total, data.len() as u64);
    assert_eq!(counter.load(Ordering::Relaxed), data.len() as u64);
    assert_eq!(std::fs::read(out_dir.join("notes.txt")).unwrap(), data);
}

#[test]
fn test_extract_to_full_path() {
    let (temp, path) = archive_on_disk("a.zst", b"alpha");
    let dest = temp.path().join("renamed.bin");

    let mut handle = host::open_archive(&path, OpenMode::Extract).unwrap();
    handle.read_header().unwrap();
    handle
        .process_file(Operation::Extract {
            dest_path: None,
            dest_name: dest.clone(),
        })
        .unwrap();
    assert_eq!(std::fs::read(dest).unwrap(), b"alpha");
}

#[test]
fn test_extract_cancelled_removes_partial_file() {
    let data = common::sample_data(500_000, 33);
    let (temp, path) = archive_on_disk("big.zst", &data);
    let dest = temp.path().join("big");

    let mut handle = host::open_archive(&path, OpenMode::Extract).unwrap();
    handle.set_process_data_proc(Some(Arc::new(|_: &str, _: usize| false)));
    let err = handle
        .process_file(Operation::Extract {
            dest_path: None,
            dest_name: dest.clone(),
        })
        .unwrap_err();

    assert!(err.is_cancellation());
    assert_eq!(err.host_code(), zstarc::error::host_code::E_EABORTED);
    assert!(!dest.exists());
}

#[test]
fn test_extract_corrupt_archive_removes_partial_file() {
    let temp = TempDir::new().unwrap();
    let mut bytes = common::pack(&common::sample_data(100_000, 34), 3);
    let half = bytes.len() / 2;
    bytes.truncate(half);
    let path = common::write_file(temp.path(), "cut.zst", &bytes);
    let dest = temp.path().join("cut");

    let mut handle = host::open_archive(&path, OpenMode::Extract).unwrap();
    let err = handle
        .process_file(Operation::Extract {
            dest_path: None,
            dest_name: dest.clone(),
        })
        .unwrap_err();
    assert!(err.is_corruption());
    assert!(!dest.exists());
}

#[test]
fn test_extract_into_missing_directory_is_write_error() {
    let (temp, path) = archive_on_disk("w.zst", b"data");
    let mut handle = host::open_archive(&path, OpenMode::Extract).unwrap();
    let err = handle
        .process_file(Operation::Extract {
            dest_path: Some(temp.path().join("missing")),
            dest_name: PathBuf::from("w"),
        })
        .unwrap_err();
    assert!(matches!(err, Error::WriteFailed(_)));
}

#[test]
fn test_test_operation_decodes() {
    let data = common::sample_data(80_000, 35);
    let (_temp, path) = archive_on_disk("t.zst", &data);

    let mut handle = host::open_archive(&path, OpenMode::Extract).unwrap();
    handle.read_header().unwrap();
    assert_eq!(handle.process_file(Operation::Test).unwrap(), data.len() as u64);
}

#[test]
fn test_skip_does_not_decode() {
    let temp = TempDir::new().unwrap();
    let path = common::write_file(temp.path(), "junk.zst", b"\x28\xb5\x2f\xfdgarbage");
    let mut handle = host::open_archive(&path, OpenMode::List).unwrap();
    handle.read_header().unwrap();
    assert_eq!(handle.process_file(Operation::Skip).unwrap(), 0);
}

// =============================================================================
// Pack
// =============================================================================

#[test]
fn test_pack_files_first_entry_only() {
    let temp = TempDir::new().unwrap();
    let data = common::sample_data(40_000, 36);
    common::write_file(temp.path(), "one.txt", &data);
    common::write_file(temp.path(), "two.txt", b"ignored");
    let packed = temp.path().join("one.txt.zst");

    let flags = PackFlags::default();
    let stats = host::pack_files(&packed, Some(temp.path()), &["one.txt", "two.txt"][..], flags, 3)
        .unwrap();
    assert_eq!(stats.bytes_in, data.len() as u64);

    let mut session = DecompressionSession::open(&packed).unwrap();
    let mut out = Vec::new();
    session.unpack(&mut out, |_| true).unwrap();
    assert_eq!(out, data);
    assert!(temp.path().join("two.txt").exists());
}

#[test]
fn test_pack_files_move_deletes_source() {
    let temp = TempDir::new().unwrap();
    let src = common::write_file(temp.path(), "m.txt", b"move me");
    let packed = temp.path().join("m.txt.zst");

    let flags = PackFlags {
        move_files: true,
        ..PackFlags::default()
    };
    host::pack_files(&packed, Some(temp.path()), &["m.txt"][..], flags, 1).unwrap();
    assert!(!src.exists());
    assert!(host::can_handle_file(&packed));
}

#[test]
fn test_pack_files_missing_source() {
    let temp = TempDir::new().unwrap();
    let packed = temp.path().join("x.zst");
    let err = host::pack_files(&packed, Some(temp.path()), &["x"][..], PackFlags::default(), 3)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert!(!packed.exists());
}

#[test]
fn test_mem_pack_produces_frame() {
    let mut packer = host::start_mem_pack(5).unwrap();
    let mut buf = vec![0u8; 1024];
    let mut out = Vec::new();
    let step = packer.pack(b"memory", &mut buf).unwrap();
    out.extend_from_slice(&buf[..step.written]);
    assert_eq!(step.taken, 6);
    loop {
        let step = packer.pack(&[], &mut buf).unwrap();
        out.extend_from_slice(&buf[..step.written]);
        if step.status == zstarc::MemPackStatus::Done {
            break;
        }
    }
    assert_eq!(zstd::decode_all(&out[..]).unwrap(), b"memory");
}

#[test]
fn test_can_handle_file() {
    let temp = TempDir::new().unwrap();
    let good = common::write_file(temp.path(), "g.zst", &common::pack(b"x", 3));
    let bad = common::write_file(temp.path(), "b.zst", b"PK\x03\x04");
    let short = common::write_file(temp.path(), "s.zst", b"\x28\xb5");

    assert!(host::can_handle_file(&good));
    assert!(!host::can_handle_file(&bad));
    assert!(!host::can_handle_file(&short));
    assert!(!host::can_handle_file(temp.path().join("missing.zst")));
}

#[test]
fn test_configure_and_caps() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("zstarc.json");
    std::fs::write(&config_path, r#"{"compression-level": 7}"#).unwrap();

    let config = host::configure_packer(Some(config_path.as_path())).unwrap();
    assert_eq!(config.compression_level, 7);

    let caps = host::packer_caps();
    assert!(caps.contains(PackerCaps::NEW | PackerCaps::MEMPACK));
    assert!(!caps.contains(PackerCaps::MULTIPLE));
    assert!(!caps.contains(PackerCaps::ENCRYPT));
}
