//! Out-of-band packet encode/decode (spec §4.5, §6 "Out-of-band XML").
//!
//! `<comment type="…" source="…">text</comment>` (types include
//! `log:info`, `log:warning`, `log:error`, `taskSize`, `taskProgress`) and
//! `<exception type="…" message="…"/>`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

use crate::error::{DasError, Result};

/// A decoded out-of-band packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Oob {
    Comment { kind: String, source: Option<String>, text: String },
    Exception { kind: String, message: String },
}

/// Parse a `<comment .../>` or `<exception .../>` OOB XML body.
pub fn parse_oob(xml: &str) -> Result<Oob> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"comment" => {
                let (kind, source) = parse_comment_attrs(&e)?;
                let text = read_text_until_end(&mut reader, "comment")?;
                return Ok(Oob::Comment { kind, source, text });
            }
            Event::Empty(e) if e.local_name().as_ref() == b"exception" => {
                let (kind, message) = parse_exception_attrs(&e)?;
                return Ok(Oob::Exception { kind, message });
            }
            Event::Eof => {
                return Err(DasError::Protocol { offset: 0, msg: "OOB packet has no comment or exception element".into() });
            }
            _ => {}
        }
        buf.clear();
    }
}

fn parse_comment_attrs(start: &BytesStart) -> Result<(String, Option<String>)> {
    let mut kind = String::new();
    let mut source = None;
    for attr in start.attributes().flatten() {
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"type" => kind = value,
            b"source" => source = Some(value),
            _ => {}
        }
    }
    Ok((kind, source))
}

fn parse_exception_attrs(start: &BytesStart) -> Result<(String, String)> {
    let mut kind = String::new();
    let mut message = String::new();
    for attr in start.attributes().flatten() {
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"type" => kind = value,
            b"message" => message = value,
            _ => {}
        }
    }
    Ok((kind, message))
}

fn read_text_until_end<R: std::io::BufRead>(reader: &mut Reader<R>, end_tag: &str) -> Result<String> {
    let mut text = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(e) if e.local_name().as_ref() == end_tag.as_bytes() => break,
            Event::Eof => return Err(DasError::Protocol { offset: 0, msg: format!("EOF inside <{end_tag}>") }),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// Encode an [`Oob`] packet back to XML for writing.
pub fn write_oob(oob: &Oob) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    match oob {
        Oob::Comment { kind, source, text } => {
            let mut tag = BytesStart::new("comment");
            tag.push_attribute(("type", kind.as_str()));
            if let Some(source) = source {
                tag.push_attribute(("source", source.as_str()));
            }
            writer.write_event(Event::Start(tag.clone()))?;
            writer.write_event(Event::Text(quick_xml::events::BytesText::new(text)))?;
            writer.write_event(Event::End(tag.to_end()))?;
        }
        Oob::Exception { kind, message } => {
            let mut tag = BytesStart::new("exception");
            tag.push_attribute(("type", kind.as_str()));
            tag.push_attribute(("message", message.as_str()));
            writer.write_event(Event::Empty(tag))?;
        }
    }
    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes).expect("writer only emits valid UTF-8"))
}

/// Build a `taskSize` comment (spec §4.5 "Progress").
pub fn task_size_comment(size: u64) -> Oob {
    Oob::Comment { kind: "taskSize".into(), source: None, text: size.to_string() }
}

/// Build a `taskProgress` comment.
pub fn task_progress_comment(done: u64) -> Oob {
    Oob::Comment { kind: "taskProgress".into(), source: None, text: done.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_comment_with_source() {
        let xml = r#"<comment type="log:info" source="reader">loaded 40 records</comment>"#;
        let oob = parse_oob(xml).unwrap();
        assert_eq!(oob, Oob::Comment { kind: "log:info".into(), source: Some("reader".into()), text: "loaded 40 records".into() });
    }

    #[test]
    fn parses_exception() {
        let xml = r#"<exception type="NoDataInInterval" message="no records in range"/>"#;
        let oob = parse_oob(xml).unwrap();
        assert_eq!(oob, Oob::Exception { kind: "NoDataInInterval".into(), message: "no records in range".into() });
    }

    #[test]
    fn write_then_parse_comment_round_trips() {
        let oob = task_progress_comment(42);
        let xml = write_oob(&oob).unwrap();
        let parsed = parse_oob(&xml).unwrap();
        assert_eq!(parsed, oob);
    }

    #[test]
    fn rejects_oob_body_with_neither_element() {
        assert!(parse_oob("<unrelated/>").is_err());
    }
}
