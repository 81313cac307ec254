//! Integration test: the deflate compress/decompress wrapper preserves
//! arbitrary byte sequences, including ones spanning multiple internal
//! buffer fills.

use das::stream::compress::{CompressReader, CompressWriter};
use std::io::{Read, Write};

#[test]
fn large_payload_round_trips_through_deflate() {
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let mut writer = CompressWriter::plain(Vec::new()).enable_deflate();
    writer.write_all(&payload).unwrap();
    let compressed = writer.into_inner().unwrap();
    assert!(compressed.len() < payload.len());

    let mut reader = CompressReader::plain(&compressed[..]).enable_deflate();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn empty_payload_round_trips() {
    let writer = CompressWriter::plain(Vec::new()).enable_deflate();
    let compressed = writer.into_inner().unwrap();
    let mut reader = CompressReader::plain(&compressed[..]).enable_deflate();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert!(out.is_empty());
}
