//! Integration tests for the async decompression session.

#![cfg(feature = "async")]

use std::io::Cursor;

use tempfile::TempDir;
use zstarc::{AsyncDecompressionSession, Error, SessionOptions, SessionState};

mod common;

#[tokio::test]
async fn test_async_open_and_unpack_file() {
    let temp = TempDir::new().unwrap();
    let data = common::sample_data(1_500_000, 51);
    let path = common::write_file(temp.path(), "big.zst", &common::pack_with_size(&data, 3));

    let mut session = AsyncDecompressionSession::open(&path).await.unwrap();
    assert_eq!(session.uncompressed_size().await, Some(data.len() as u64));

    let mut out = Vec::new();
    let mut reported = 0u64;
    let total = session
        .unpack(&mut out, |n| {
            reported += n as u64;
            true
        })
        .await
        .unwrap();

    assert_eq!(total, data.len() as u64);
    assert_eq!(reported, total);
    assert_eq!(out, data);
    assert_eq!(session.state(), SessionState::Eof);
}

#[tokio::test]
async fn test_async_open_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = AsyncDecompressionSession::open(temp.path().join("none.zst"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_concatenated_frames() {
    let mut bytes = common::pack(b"one,", 3);
    bytes.extend_from_slice(&common::pack(b"two", 3));
    let options = SessionOptions::new().segment_size(3).output_size(2);
    let mut session = AsyncDecompressionSession::with_options(Cursor::new(bytes), options).unwrap();
    let mut out = Vec::new();
    session.unpack(&mut out, |_| true).await.unwrap();
    assert_eq!(out, b"one,two");
}

#[tokio::test]
async fn test_async_garbage_is_bad_archive() {
    let mut session =
        AsyncDecompressionSession::new(Cursor::new(common::random_data(2048, 52))).unwrap();
    let err = session.test(|_| true).await.unwrap_err();
    assert!(err.is_corruption());
}

#[tokio::test]
async fn test_async_single_use() {
    let bytes = common::pack(b"once", 3);
    let mut session = AsyncDecompressionSession::new(Cursor::new(bytes)).unwrap();
    session.test(|_| true).await.unwrap();
    assert!(session.test(|_| true).await.is_err());
}

#[tokio::test]
async fn test_async_drop_with_read_in_flight() {
    let bytes = common::pack(&common::sample_data(10_000, 53), 3);
    let session = AsyncDecompressionSession::new(Cursor::new(bytes)).unwrap();
    assert_eq!(session.state(), SessionState::Priming);
    drop(session);
}
