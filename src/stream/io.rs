//! Stream read/write loop (spec §4.5 "Read loop" / "Write loop").
//!
//! The handler table is keyed by packet id (`HashMap<u8, PacketDescriptor>`
//! for the registered descriptors, dispatched to a single [`Handlers`]
//! implementation) — grounded on the teacher's `Request` dispatch-by-tag
//! enum in `bin/rfdb_server.rs`, generalised from a fixed enum to an
//! open-ended registry since das packet ids are 01..99 rather than a
//! small fixed command set.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::error::{DasError, Result};
use crate::stream::compress::{CompressReader, CompressWriter};
use crate::stream::descriptor::{
    parse_packet_descriptor, parse_stream_descriptor, write_packet_descriptor, PacketDescriptor,
    StreamDescriptor,
};
use crate::stream::framing::{self, PacketTag};
use crate::stream::oob::{parse_oob, write_oob, Oob};

/// Callbacks invoked by [`StreamReader::read_all`] as packets are decoded
/// (spec §4.5 "Read loop").
pub trait Handlers {
    fn on_packet_descriptor(&mut self, _desc: &PacketDescriptor) {}
    fn on_data(&mut self, _desc: &PacketDescriptor, _record: &[u8]) {}
    fn on_comment(&mut self, _oob: &Oob) {}
    fn on_exception(&mut self, _oob: &Oob) {}
    fn on_close(&mut self) {}
}

fn record_size(desc: &PacketDescriptor) -> Result<usize> {
    let mut total = 0usize;
    let x = desc.x.as_ref().ok_or_else(|| {
        DasError::Protocol { offset: 0, msg: format!("packet {} descriptor has no <x> plane", desc.id) }
    })?;
    total += x.length.ok_or_else(|| {
        DasError::Protocol { offset: 0, msg: format!("packet {} <x> plane has no length", desc.id) }
    })? as usize;
    for plane in &desc.planes {
        total += plane.length.ok_or_else(|| {
            DasError::Protocol { offset: 0, msg: format!("packet {} plane has no length", desc.id) }
        })? as usize;
    }
    Ok(total)
}

/// Reads a das stream from an underlying `BufRead`, dispatching decoded
/// packets to a [`Handlers`] implementation (spec §4.5 "Read loop").
pub struct StreamReader<R: BufRead> {
    inner: Option<CompressReader<R>>,
    descriptors: HashMap<u8, PacketDescriptor>,
    stream_desc: Option<StreamDescriptor>,
    saw_any_packet: bool,
}

impl<R: BufRead> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        StreamReader {
            inner: Some(CompressReader::plain(inner)),
            descriptors: HashMap::new(),
            stream_desc: None,
            saw_any_packet: false,
        }
    }

    pub fn stream_descriptor(&self) -> Option<&StreamDescriptor> {
        self.stream_desc.as_ref()
    }

    fn reader(&mut self) -> &mut CompressReader<R> {
        self.inner.as_mut().expect("reader taken")
    }

    fn read_exact_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.reader().read_exact(&mut buf)?;
        Ok(buf)
    }

    fn try_read_tag(&mut self) -> Result<Option<[u8; 4]>> {
        let mut tag = [0u8; 4];
        let mut read = 0;
        while read < 4 {
            let n = self.reader().read(&mut tag[read..])?;
            if n == 0 {
                if read == 0 {
                    return Ok(None);
                }
                return Err(DasError::Protocol { offset: 0, msg: "EOF inside packet tag".into() });
            }
            read += n;
        }
        Ok(Some(tag))
    }

    fn read_len6(&mut self) -> Result<usize> {
        let bytes = self.read_exact_bytes(6)?;
        let arr: [u8; 6] = bytes.try_into().unwrap();
        framing::parse_len6(&arr)
    }

    /// Drive the read loop to completion, invoking `handlers` for every
    /// decoded packet (spec §4.5 "Read loop", steps 1-5).
    pub fn read_all(&mut self, handlers: &mut impl Handlers) -> Result<()> {
        loop {
            let Some(tag) = self.try_read_tag()? else {
                if !self.saw_any_packet {
                    return Err(DasError::Protocol { offset: 0, msg: "EOF before first valid packet".into() });
                }
                handlers.on_close();
                return Ok(());
            };
            match framing::classify_tag(&tag)? {
                PacketTag::Descriptor(0) => {
                    let len = self.read_len6()?;
                    let xml = String::from_utf8(self.read_exact_bytes(len)?)
                        .map_err(|_| DasError::Protocol { offset: 0, msg: "stream descriptor is not UTF-8".into() })?;
                    if self.stream_desc.is_some() {
                        return Err(DasError::Protocol { offset: 0, msg: "duplicate stream descriptor".into() });
                    }
                    let desc = parse_stream_descriptor(&xml)?;
                    if desc.compression.as_deref() == Some("deflate") {
                        let inner = self.inner.take().expect("reader taken");
                        self.inner = Some(inner.enable_deflate());
                    }
                    self.stream_desc = Some(desc);
                    self.saw_any_packet = true;
                }
                PacketTag::Descriptor(id) => {
                    let len = self.read_len6()?;
                    let xml = String::from_utf8(self.read_exact_bytes(len)?)
                        .map_err(|_| DasError::Protocol { offset: 0, msg: "packet descriptor is not UTF-8".into() })?;
                    let desc = parse_packet_descriptor(id, &xml)?;
                    handlers.on_packet_descriptor(&desc);
                    // a redefinition frees the prior descriptor (spec §4.5 step 2).
                    self.descriptors.insert(id, desc);
                    self.saw_any_packet = true;
                }
                PacketTag::Data(id) => {
                    let desc = self.descriptors.get(&id).cloned().ok_or_else(|| {
                        DasError::Protocol { offset: 0, msg: format!("data packet {id} has no registered descriptor") }
                    })?;
                    let size = record_size(&desc)?;
                    let record = self.read_exact_bytes(size)?;
                    handlers.on_data(&desc, &record);
                    self.saw_any_packet = true;
                }
                PacketTag::Oob => {
                    let len = self.read_len6()?;
                    let xml = String::from_utf8(self.read_exact_bytes(len)?)
                        .map_err(|_| DasError::Protocol { offset: 0, msg: "OOB packet is not UTF-8".into() })?;
                    let oob = parse_oob(&xml)?;
                    match &oob {
                        Oob::Comment { .. } => handlers.on_comment(&oob),
                        Oob::Exception { .. } => handlers.on_exception(&oob),
                    }
                    self.saw_any_packet = true;
                }
            }
        }
    }
}

/// Writes a das stream to an underlying `Write` (spec §4.5 "Write loop").
pub struct StreamWriter<W: Write> {
    inner: Option<CompressWriter<W>>,
    wrote_stream_desc: bool,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        StreamWriter { inner: Some(CompressWriter::plain(inner)), wrote_stream_desc: false }
    }

    fn writer(&mut self) -> &mut CompressWriter<W> {
        self.inner.as_mut().expect("writer taken")
    }

    fn write_framed(&mut self, tag: [u8; 4], xml: &str) -> Result<()> {
        let len = framing::encode_len6(xml.len())?;
        self.writer().write_all(&tag)?;
        self.writer().write_all(&len)?;
        self.writer().write_all(xml.as_bytes())?;
        Ok(())
    }

    /// Write the root `[00]` stream descriptor. Transitions the writer
    /// into deflate mode if `compression="deflate"` (spec §4.5).
    pub fn write_stream_desc(&mut self, desc: &StreamDescriptor) -> Result<()> {
        if self.wrote_stream_desc {
            return Err(DasError::Protocol { offset: 0, msg: "stream descriptor already written".into() });
        }
        let xml = match &desc.compression {
            Some(c) => format!(r#"<stream compression="{c}"/>"#),
            None => "<stream/>".to_string(),
        };
        self.write_framed(framing::descriptor_tag(0), &xml)?;
        if desc.compression.as_deref() == Some("deflate") {
            let inner = self.inner.take().expect("writer taken");
            self.inner = Some(inner.enable_deflate());
        }
        self.wrote_stream_desc = true;
        Ok(())
    }

    pub fn write_packet_desc(&mut self, desc: &PacketDescriptor) -> Result<()> {
        let xml = write_packet_descriptor(desc)?;
        self.write_framed(framing::descriptor_tag(desc.id), &xml)
    }

    pub fn write_data(&mut self, id: u8, record: &[u8]) -> Result<()> {
        self.writer().write_all(&framing::data_tag(id))?;
        self.writer().write_all(record)?;
        Ok(())
    }

    pub fn write_oob(&mut self, oob: &Oob) -> Result<()> {
        let xml = write_oob(oob)?;
        self.write_framed(framing::oob_tag(), &xml)
    }

    pub fn finish(mut self) -> Result<W> {
        let inner = self.inner.take().expect("writer taken");
        Ok(inner.into_inner()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::descriptor::{Plane, PlaneKind};
    use std::io::BufReader;

    #[derive(Default)]
    struct Recorder {
        descriptors: Vec<u8>,
        data: Vec<(u8, Vec<u8>)>,
        comments: Vec<Oob>,
        closed: bool,
    }

    impl Handlers for Recorder {
        fn on_packet_descriptor(&mut self, desc: &PacketDescriptor) {
            self.descriptors.push(desc.id);
        }
        fn on_data(&mut self, desc: &PacketDescriptor, record: &[u8]) {
            self.data.push((desc.id, record.to_vec()));
        }
        fn on_comment(&mut self, oob: &Oob) {
            self.comments.push(oob.clone());
        }
        fn on_exception(&mut self, oob: &Oob) {
            self.comments.push(oob.clone());
        }
        fn on_close(&mut self) {
            self.closed = true;
        }
    }

    fn sample_descriptor() -> PacketDescriptor {
        PacketDescriptor {
            id: 1,
            x: Some(Plane { kind: PlaneKind::X, units: "us2000".into(), value_type: Some("double".into()), length: Some(8), name: None }),
            planes: vec![Plane { kind: PlaneKind::Y, units: "eV".into(), value_type: Some("float".into()), length: Some(4), name: None }],
            properties: HashMap::new(),
        }
    }

    #[test]
    fn plain_round_trip_descriptor_and_data() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_stream_desc(&StreamDescriptor::default()).unwrap();
        w.write_packet_desc(&sample_descriptor()).unwrap();
        w.write_data(1, &[0u8; 12]).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = StreamReader::new(BufReader::new(&bytes[..]));
        let mut rec = Recorder::default();
        r.read_all(&mut rec).unwrap();
        assert_eq!(rec.descriptors, vec![1]);
        assert_eq!(rec.data.len(), 1);
        assert_eq!(rec.data[0].1.len(), 12);
        assert!(rec.closed);
    }

    #[test]
    fn deflate_round_trip() {
        let desc = StreamDescriptor { compression: Some("deflate".into()), properties: HashMap::new() };
        let mut w = StreamWriter::new(Vec::new());
        w.write_stream_desc(&desc).unwrap();
        w.write_packet_desc(&sample_descriptor()).unwrap();
        w.write_data(1, &[1u8; 12]).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = StreamReader::new(BufReader::new(&bytes[..]));
        let mut rec = Recorder::default();
        r.read_all(&mut rec).unwrap();
        assert_eq!(rec.data[0].1, vec![1u8; 12]);
    }

    #[test]
    fn oob_comment_is_routed_to_on_comment() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_stream_desc(&StreamDescriptor::default()).unwrap();
        w.write_oob(&Oob::Comment { kind: "log:info".into(), source: None, text: "hi".into() }).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = StreamReader::new(BufReader::new(&bytes[..]));
        let mut rec = Recorder::default();
        r.read_all(&mut rec).unwrap();
        assert_eq!(rec.comments.len(), 1);
    }

    #[test]
    fn data_packet_with_no_registered_descriptor_errors() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_stream_desc(&StreamDescriptor::default()).unwrap();
        w.write_data(5, &[0u8; 4]).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = StreamReader::new(BufReader::new(&bytes[..]));
        let mut rec = Recorder::default();
        assert!(r.read_all(&mut rec).is_err());
    }

    #[test]
    fn eof_before_first_packet_is_protocol_error() {
        let mut r = StreamReader::new(BufReader::new(&b""[..]));
        let mut rec = Recorder::default();
        assert!(r.read_all(&mut rec).is_err());
    }

    #[test]
    fn redefining_a_descriptor_replaces_the_prior_one() {
        let mut w = StreamWriter::new(Vec::new());
        w.write_stream_desc(&StreamDescriptor::default()).unwrap();
        w.write_packet_desc(&sample_descriptor()).unwrap();
        let mut second = sample_descriptor();
        second.planes.clear();
        w.write_packet_desc(&second).unwrap();
        w.write_data(1, &[0u8; 8]).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = StreamReader::new(BufReader::new(&bytes[..]));
        let mut rec = Recorder::default();
        r.read_all(&mut rec).unwrap();
        assert_eq!(rec.data[0].1.len(), 8);
    }
}
