//! Descriptor XML tree (spec §4.5, §6 "Descriptor XML").
//!
//! Parsing follows the teacher-adjacent `quick_xml::{Reader, Writer}`
//! event-loop style seen in the VOTable reader retrieved alongside this
//! pack: a plain `Event` match loop building up owned structs, no derive
//! magic.

use std::collections::HashMap;
use std::io::Cursor;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{DasError, Result};

/// A `<x>`/`<y>`/`<yscan>`/`<z>` plane inside a `<packet>` descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub kind: PlaneKind,
    pub units: String,
    /// Binary encoding, e.g. `ascii`, `float`, `double`, `time`.
    pub value_type: Option<String>,
    pub length: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    X,
    Y,
    YScan,
    Z,
}

impl PlaneKind {
    fn tag(self) -> &'static str {
        match self {
            PlaneKind::X => "x",
            PlaneKind::Y => "y",
            PlaneKind::YScan => "yscan",
            PlaneKind::Z => "z",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "x" => Some(PlaneKind::X),
            "y" => Some(PlaneKind::Y),
            "yscan" => Some(PlaneKind::YScan),
            "z" => Some(PlaneKind::Z),
            _ => None,
        }
    }
}

/// Recognised `<properties>` value types (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Boolean(bool),
    Int(i64),
    Double(f64),
    Datum(String),
    DatumRange(String),
    Time(String),
    TimeRange(String),
}

/// A `<packet>` descriptor: one `<x>` plane, zero or more `<y>`/`<yscan>`/
/// `<z>` planes, optional `<properties>`.
#[derive(Debug, Clone, Default)]
pub struct PacketDescriptor {
    pub id: u8,
    pub x: Option<Plane>,
    pub planes: Vec<Plane>,
    pub properties: HashMap<String, PropertyValue>,
}

/// The root `<stream>` descriptor.
#[derive(Debug, Clone, Default)]
pub struct StreamDescriptor {
    pub compression: Option<String>,
    pub properties: HashMap<String, PropertyValue>,
}

/// Parse the root `<stream ...>...</stream>` descriptor.
pub fn parse_stream_descriptor(xml: &str) -> Result<StreamDescriptor> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();
    let mut desc = StreamDescriptor::default();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"stream" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"compression" {
                        desc.compression = Some(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"properties" => {
                desc.properties = parse_properties(&e)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"properties" => {
                desc.properties = parse_properties(&e)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(desc)
}

/// Parse a `<packet id="NN">` descriptor body.
pub fn parse_packet_descriptor(id: u8, xml: &str) -> Result<PacketDescriptor> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();
    let mut desc = PacketDescriptor { id, ..Default::default() };
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if local == "properties" {
                    desc.properties = parse_properties(&e)?;
                } else if let Some(kind) = PlaneKind::from_tag(&local) {
                    let plane = parse_plane(kind, &e)?;
                    if kind == PlaneKind::X {
                        desc.x = Some(plane);
                    } else {
                        desc.planes.push(plane);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(desc)
}

fn parse_plane(kind: PlaneKind, start: &BytesStart) -> Result<Plane> {
    let mut units = String::new();
    let mut value_type = None;
    let mut length = None;
    let mut name = None;
    for attr in start.attributes().flatten() {
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"units" => units = value,
            b"type" => value_type = Some(value),
            b"length" => {
                length = Some(value.parse().map_err(|_| {
                    DasError::Protocol { offset: 0, msg: format!("invalid plane length '{value}'") }
                })?)
            }
            b"name" => name = Some(value),
            _ => {}
        }
    }
    Ok(Plane { kind, units, value_type, length, name })
}

fn parse_properties(start: &BytesStart) -> Result<HashMap<String, PropertyValue>> {
    let mut out = HashMap::new();
    for attr in start.attributes().flatten() {
        if attr.key.as_ref() == b"name" {
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = attr.unescape_value()?.into_owned();
        let Some((kind, name)) = key.split_once(':') else { continue };
        let value = match kind {
            "String" => PropertyValue::String(raw),
            "boolean" => PropertyValue::Boolean(raw == "true"),
            "int" => PropertyValue::Int(raw.parse().map_err(|_| {
                DasError::Protocol { offset: 0, msg: format!("invalid int property '{raw}'") }
            })?),
            "double" => PropertyValue::Double(raw.parse().map_err(|_| {
                DasError::Protocol { offset: 0, msg: format!("invalid double property '{raw}'") }
            })?),
            "Datum" => PropertyValue::Datum(raw),
            "DatumRange" => PropertyValue::DatumRange(raw),
            "Time" => PropertyValue::Time(raw),
            "TimeRange" => PropertyValue::TimeRange(raw),
            other => {
                return Err(DasError::Protocol { offset: 0, msg: format!("unrecognised property type '{other}'") });
            }
        };
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

/// Serialise a `<packet>` descriptor back to XML for writing.
pub fn write_packet_descriptor(desc: &PacketDescriptor) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut packet = BytesStart::new("packet");
    let id_str = desc.id.to_string();
    packet.push_attribute(("id", id_str.as_str()));
    writer.write_event(Event::Start(packet.clone()))?;

    if let Some(x) = &desc.x {
        write_plane(&mut writer, x)?;
    }
    for plane in &desc.planes {
        write_plane(&mut writer, plane)?;
    }
    writer.write_event(Event::End(packet.to_end()))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes).expect("writer only emits valid UTF-8"))
}

fn write_plane(writer: &mut Writer<Cursor<Vec<u8>>>, plane: &Plane) -> Result<()> {
    let mut tag = BytesStart::new(plane.kind.tag());
    tag.push_attribute(("units", plane.units.as_str()));
    if let Some(vt) = &plane.value_type {
        tag.push_attribute(("type", vt.as_str()));
    }
    let length_str;
    if let Some(len) = plane.length {
        length_str = len.to_string();
        tag.push_attribute(("length", length_str.as_str()));
    }
    if let Some(name) = &plane.name {
        tag.push_attribute(("name", name.as_str()));
    }
    writer.write_event(Event::Empty(tag))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_descriptor_with_compression() {
        let xml = r#"<stream compression="deflate"/>"#;
        let desc = parse_stream_descriptor(xml).unwrap();
        assert_eq!(desc.compression.as_deref(), Some("deflate"));
    }

    #[test]
    fn parses_stream_descriptor_without_compression() {
        let xml = r#"<stream/>"#;
        let desc = parse_stream_descriptor(xml).unwrap();
        assert_eq!(desc.compression, None);
    }

    #[test]
    fn parses_packet_descriptor_with_x_and_y_planes() {
        let xml = r#"<packet id="1"><x units="us2000" type="double" length="8"/><y units="m" type="float" length="4" name="alt"/></packet>"#;
        let desc = parse_packet_descriptor(1, xml).unwrap();
        assert_eq!(desc.x.as_ref().unwrap().units, "us2000");
        assert_eq!(desc.planes.len(), 1);
        assert_eq!(desc.planes[0].kind, PlaneKind::Y);
        assert_eq!(desc.planes[0].name.as_deref(), Some("alt"));
    }

    #[test]
    fn parses_properties_by_type_prefix() {
        let xml = r#"<packet id="2"><x units=""/><properties name="String:title" String:title="Electron flux" int:count="3" double:scale="1.5" boolean:valid="true"/></packet>"#;
        let desc = parse_packet_descriptor(2, xml).unwrap();
        assert_eq!(desc.properties.get("title"), Some(&PropertyValue::String("Electron flux".into())));
        assert_eq!(desc.properties.get("count"), Some(&PropertyValue::Int(3)));
        assert_eq!(desc.properties.get("scale"), Some(&PropertyValue::Double(1.5)));
        assert_eq!(desc.properties.get("valid"), Some(&PropertyValue::Boolean(true)));
    }

    #[test]
    fn write_then_parse_packet_descriptor_round_trips_planes() {
        let desc = PacketDescriptor {
            id: 9,
            x: Some(Plane { kind: PlaneKind::X, units: "us2000".into(), value_type: Some("double".into()), length: Some(8), name: None }),
            planes: vec![Plane { kind: PlaneKind::Z, units: "eV".into(), value_type: Some("float".into()), length: Some(4), name: Some("flux".into()) }],
            properties: HashMap::new(),
        };
        let xml = write_packet_descriptor(&desc).unwrap();
        let parsed = parse_packet_descriptor(9, &xml).unwrap();
        assert_eq!(parsed.x.unwrap().units, "us2000");
        assert_eq!(parsed.planes[0].name.as_deref(), Some("flux"));
    }

    #[test]
    fn rejects_unrecognised_property_type() {
        let xml = r#"<packet id="1"><x units=""/><properties name="x" weird:key="1"/></packet>"#;
        assert!(parse_packet_descriptor(1, xml).is_err());
    }
}
