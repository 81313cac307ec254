//! Packet framing (spec §4.5, §6 wire grammar).
//!
//! ```text
//! stream      := '[00]' LEN6 stream-desc-xml  packet*
//! packet      := descriptor | data | oob
//! descriptor  := '[' DD ']' LEN6 packet-desc-xml           ; DD = 01..99
//! data        := ':' DD ':' record-bytes                    ; length from descriptor
//! oob         := '[xx]' LEN6 oob-xml
//! LEN6        := 6 ASCII decimal digits, zero-padded
//! ```

use crate::error::{DasError, Result};

/// Classification of a four-byte packet tag (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketTag {
    /// `[DD]` descriptor header, `DD` in 00..99 (00 is the root stream
    /// descriptor).
    Descriptor(u8),
    /// `:DD:` data packet, `DD` in 01..99.
    Data(u8),
    /// `[xx]` out-of-band packet.
    Oob,
}

/// Parse a four-byte tag read from the wire into its classification.
pub fn classify_tag(tag: &[u8; 4]) -> Result<PacketTag> {
    if tag[0] == b'[' && tag[3] == b']' {
        if &tag[1..3] == b"xx" {
            return Ok(PacketTag::Oob);
        }
        let id = parse_two_digit(&tag[1..3])?;
        return Ok(PacketTag::Descriptor(id));
    }
    if tag[0] == b':' && tag[3] == b':' {
        let id = parse_two_digit(&tag[1..3])?;
        if id == 0 {
            return Err(DasError::Protocol { offset: 0, msg: "data packet id 00 is reserved for the stream descriptor".into() });
        }
        return Ok(PacketTag::Data(id));
    }
    Err(DasError::Protocol { offset: 0, msg: format!("unrecognised packet tag {:?}", String::from_utf8_lossy(tag)) })
}

fn parse_two_digit(bytes: &[u8]) -> Result<u8> {
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(DasError::Protocol { offset: 0, msg: format!("invalid packet id digits {:?}", String::from_utf8_lossy(bytes)) });
    }
    let s = std::str::from_utf8(bytes).unwrap();
    Ok(s.parse().unwrap())
}

/// Encode a `[DD]` or `[xx]` descriptor/OOB tag.
pub fn descriptor_tag(id: u8) -> [u8; 4] {
    let mut out = [b'[', b'0', b'0', b']'];
    let digits = format!("{id:02}");
    out[1] = digits.as_bytes()[0];
    out[2] = digits.as_bytes()[1];
    out
}

/// Encode an `[xx]` out-of-band tag.
pub fn oob_tag() -> [u8; 4] {
    [b'[', b'x', b'x', b']']
}

/// Encode a `:DD:` data tag.
pub fn data_tag(id: u8) -> [u8; 4] {
    let mut out = [b':', b'0', b'0', b':'];
    let digits = format!("{id:02}");
    out[1] = digits.as_bytes()[0];
    out[2] = digits.as_bytes()[1];
    out
}

/// Parse a six-digit zero-padded ASCII decimal length.
pub fn parse_len6(bytes: &[u8; 6]) -> Result<usize> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| DasError::Protocol { offset: 0, msg: "LEN6 is not ASCII".into() })?;
    s.parse()
        .map_err(|_| DasError::Protocol { offset: 0, msg: format!("invalid LEN6 '{s}'") })
}

/// Encode a length as a six-digit zero-padded ASCII decimal, per `LEN6`.
pub fn encode_len6(len: usize) -> Result<[u8; 6]> {
    if len > 999_999 {
        return Err(DasError::RangeOverflow(format!("packet length {len} exceeds LEN6 capacity 999999")));
    }
    let s = format!("{len:06}");
    let mut out = [0u8; 6];
    out.copy_from_slice(s.as_bytes());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_root_descriptor() {
        assert_eq!(classify_tag(b"[00]").unwrap(), PacketTag::Descriptor(0));
    }

    #[test]
    fn classify_packet_descriptor() {
        assert_eq!(classify_tag(b"[07]").unwrap(), PacketTag::Descriptor(7));
    }

    #[test]
    fn classify_data_packet() {
        assert_eq!(classify_tag(b":07:").unwrap(), PacketTag::Data(7));
    }

    #[test]
    fn classify_oob_packet() {
        assert_eq!(classify_tag(b"[xx]").unwrap(), PacketTag::Oob);
    }

    #[test]
    fn classify_data_packet_id_zero_is_rejected() {
        assert!(classify_tag(b":00:").is_err());
    }

    #[test]
    fn classify_garbage_tag_errors() {
        assert!(classify_tag(b"abcd").is_err());
    }

    #[test]
    fn len6_round_trips() {
        let enc = encode_len6(1234).unwrap();
        assert_eq!(&enc, b"001234");
        assert_eq!(parse_len6(&enc).unwrap(), 1234);
    }

    #[test]
    fn len6_rejects_oversized_length() {
        assert!(encode_len6(1_000_000).is_err());
    }

    #[test]
    fn descriptor_and_data_tags_round_trip_through_classify() {
        assert_eq!(classify_tag(&descriptor_tag(42)).unwrap(), PacketTag::Descriptor(42));
        assert_eq!(classify_tag(&data_tag(42)).unwrap(), PacketTag::Data(42));
        assert_eq!(classify_tag(&oob_tag()).unwrap(), PacketTag::Oob);
    }
}
