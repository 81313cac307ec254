//! Deflate wrap for stream I/O (spec §4.5 "Compression").
//!
//! When the root stream descriptor declares `compression="deflate"`,
//! every byte after it is a raw zlib stream. The I/O layer owns the
//! inflate/deflate buffers; callers are unaware once enabled.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Write-side wrapper: buffers all writes through a zlib encoder once
/// enabled, otherwise passes bytes straight through.
pub enum CompressWriter<W: Write> {
    Plain(W),
    Deflate(ZlibEncoder<W>),
}

impl<W: Write> CompressWriter<W> {
    pub fn plain(inner: W) -> Self {
        CompressWriter::Plain(inner)
    }

    /// Switch to deflate mode. Grounded in spec §4.5: "The first call to
    /// `write_stream_desc` also transitions the output into deflate mode".
    pub fn enable_deflate(self) -> Self {
        match self {
            CompressWriter::Plain(w) => CompressWriter::Deflate(ZlibEncoder::new(w, Compression::default())),
            already => already,
        }
    }

    pub fn into_inner(self) -> io::Result<W> {
        match self {
            CompressWriter::Plain(w) => Ok(w),
            CompressWriter::Deflate(enc) => enc.finish(),
        }
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressWriter::Plain(w) => w.write(buf),
            CompressWriter::Deflate(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressWriter::Plain(w) => w.flush(),
            CompressWriter::Deflate(enc) => enc.flush(),
        }
    }
}

/// Read-side wrapper, symmetric with [`CompressWriter`].
pub enum CompressReader<R: Read> {
    Plain(R),
    Deflate(ZlibDecoder<R>),
}

impl<R: Read> CompressReader<R> {
    pub fn plain(inner: R) -> Self {
        CompressReader::Plain(inner)
    }

    pub fn enable_deflate(self) -> Self {
        match self {
            CompressReader::Plain(r) => CompressReader::Deflate(ZlibDecoder::new(r)),
            already => already,
        }
    }
}

impl<R: Read> Read for CompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            CompressReader::Plain(r) => r.read(buf),
            CompressReader::Deflate(dec) => dec.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_round_trips_without_transformation() {
        let mut w = CompressWriter::plain(Vec::new());
        w.write_all(b"hello").unwrap();
        let bytes = w.into_inner().unwrap();
        let mut r = CompressReader::plain(&bytes[..]);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn deflate_round_trips() {
        let mut w = CompressWriter::plain(Vec::new()).enable_deflate();
        w.write_all(b"the quick brown fox jumps over the lazy dog").unwrap();
        let bytes = w.into_inner().unwrap();
        assert_ne!(bytes, b"the quick brown fox jumps over the lazy dog");
        let mut r = CompressReader::plain(&bytes[..]).enable_deflate();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn enable_deflate_is_idempotent_on_already_deflate_writer() {
        let w = CompressWriter::plain(Vec::new()).enable_deflate();
        let w2 = w.enable_deflate();
        assert!(matches!(w2, CompressWriter::Deflate(_)));
    }
}
