//! Value layer: the closed enumeration of primitive value types, and
//! `Datum`, a value plus its type plus its units carried inline (spec §3).

use crate::error::{DasError, Result};
use crate::time::BrokenDownTime;
use crate::units::UnitId;

/// Large enough to hold a `BrokenDownTime` (i32 + u8*4 + u16 + f64, packed)
/// or a 4-component `GeoVec` plus frame metadata, whichever is larger.
pub const DATUM_INLINE: usize = 40;

/// How to interpret a value's bytes beyond its raw numeric type (spec §3
/// "default semantic").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Number,
    Bool,
    DateTime,
    Text,
    Binary,
    Vector,
    Index,
}

/// The closed enumeration of primitive value types (spec §3 "Value type").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Time,
    Text,
    ByteSeq,
    GeoVec,
    Index,
}

impl ValueType {
    /// Byte size of one element's fixed-width on-the-wire representation.
    /// `Text` and `ByteSeq` are variable-length and report `0` here; their
    /// length travels out-of-band (the packet descriptor's `length`
    /// attribute, per spec §6).
    pub fn byte_size(self) -> usize {
        match self {
            ValueType::U8 | ValueType::I8 => 1,
            ValueType::U16 | ValueType::I16 => 2,
            ValueType::U32 | ValueType::I32 | ValueType::F32 => 4,
            ValueType::U64 | ValueType::I64 | ValueType::F64 => 8,
            ValueType::Time => 16, // year:i32, yday:u16, hour:u8, minute:u8, second:f64, month:u8, mday:u8 + pad
            ValueType::Text | ValueType::ByteSeq => 0,
            ValueType::GeoVec => 4 * 8 + 2, // 4 f64 components + n + frame_id
            ValueType::Index => 8,          // (offset: u32, count: u32)
        }
    }

    /// Canonical fill-value bytes for this type (spec §3 "canonical fill").
    pub fn fill_bytes(self) -> Vec<u8> {
        match self {
            ValueType::U8 => vec![0xFFu8],
            ValueType::U16 => 0xFFFFu16.to_le_bytes().to_vec(),
            ValueType::U32 => 0xFFFF_FFFFu32.to_le_bytes().to_vec(),
            ValueType::U64 => 0xFFFF_FFFF_FFFF_FFFFu64.to_le_bytes().to_vec(),
            ValueType::I8 => (-128i8).to_le_bytes().to_vec(),
            ValueType::I16 => i16::MIN.to_le_bytes().to_vec(),
            ValueType::I32 => i32::MIN.to_le_bytes().to_vec(),
            ValueType::I64 => i64::MIN.to_le_bytes().to_vec(),
            ValueType::F32 => f32::NAN.to_le_bytes().to_vec(),
            ValueType::F64 => f64::NAN.to_le_bytes().to_vec(),
            ValueType::Time => f64::NAN.to_le_bytes().to_vec(),
            ValueType::Text | ValueType::ByteSeq => Vec::new(),
            ValueType::GeoVec => f64::NAN.to_le_bytes().to_vec(),
            ValueType::Index => vec![0xFFu8; 8],
        }
    }

    pub fn semantic(self) -> Semantic {
        match self {
            ValueType::Time => Semantic::DateTime,
            ValueType::Text => Semantic::Text,
            ValueType::ByteSeq => Semantic::Binary,
            ValueType::GeoVec => Semantic::Vector,
            ValueType::Index => Semantic::Index,
            _ => Semantic::Number,
        }
    }

    /// True for the integer/float "short" types used by binary-op type
    /// promotion (spec §4.2.1: "≤4 bytes integer or float32").
    pub fn is_short(self) -> bool {
        matches!(
            self,
            ValueType::U8
                | ValueType::I8
                | ValueType::U16
                | ValueType::I16
                | ValueType::U32
                | ValueType::I32
                | ValueType::F32
        )
    }

    pub fn is_time(self) -> bool {
        matches!(self, ValueType::Time)
    }

    /// Total-order byte comparison without allocating; used by the array
    /// layer's fill-detection and by zone-map-free range checks.
    pub fn cmp_bytes(self, a: &[u8], b: &[u8]) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        macro_rules! cmp_as {
            ($t:ty) => {{
                let x = <$t>::from_le_bytes(a[..std::mem::size_of::<$t>()].try_into().unwrap());
                let y = <$t>::from_le_bytes(b[..std::mem::size_of::<$t>()].try_into().unwrap());
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }};
        }
        match self {
            ValueType::U8 => a[0].cmp(&b[0]),
            ValueType::U16 => cmp_as!(u16),
            ValueType::U32 => cmp_as!(u32),
            ValueType::U64 => cmp_as!(u64),
            ValueType::I8 => (a[0] as i8).cmp(&(b[0] as i8)),
            ValueType::I16 => cmp_as!(i16),
            ValueType::I32 => cmp_as!(i32),
            ValueType::I64 => cmp_as!(i64),
            ValueType::F32 => cmp_as!(f32),
            ValueType::F64 | ValueType::Time => cmp_as!(f64),
            ValueType::Text | ValueType::ByteSeq => a.cmp(b),
            ValueType::GeoVec => cmp_as!(f64),
            ValueType::Index => cmp_as!(u64),
        }
    }
}

/// A geometric vector with up to 4 components, a reference-frame id, and a
/// component-ordering map (spec §3 "Datum").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoVec {
    pub components: [f64; 4],
    pub n: u8,
    pub frame_id: u8,
    pub order: [u8; 4],
}

impl GeoVec {
    /// Wire/inline layout for a `ValueType::GeoVec` datum: the component
    /// array followed by `n` and `frame_id` (spec §4.2.3 "`get` returns a
    /// Datum whose bytes begin with the component array followed by the
    /// frame metadata").
    pub fn to_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(34);
        for c in self.components {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out.push(self.n);
        out.push(self.frame_id);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 34 {
            return None;
        }
        let mut components = [0.0f64; 4];
        for (i, c) in components.iter_mut().enumerate() {
            *c = f64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().ok()?);
        }
        Some(GeoVec { components, n: bytes[32], frame_id: bytes[33], order: [0, 1, 2, 3] })
    }
}

/// A value plus its value type plus its units, carried inline (spec §3
/// "Datum").
#[derive(Debug, Clone, Copy)]
pub struct Datum {
    pub vt: ValueType,
    pub units: UnitId,
    bytes: [u8; DATUM_INLINE],
    len: u8,
}

impl Datum {
    pub fn from_bytes(vt: ValueType, units: UnitId, src: &[u8]) -> Result<Self> {
        if src.len() > DATUM_INLINE {
            return Err(DasError::RangeOverflow("datum payload exceeds inline capacity".into()));
        }
        let mut bytes = [0u8; DATUM_INLINE];
        bytes[..src.len()].copy_from_slice(src);
        Ok(Datum { vt, units, bytes, len: src.len() as u8 })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn f64(vt: ValueType, units: UnitId, value: f64) -> Self {
        Self::from_bytes(vt, units, &value.to_le_bytes()).unwrap()
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.vt {
            ValueType::F64 | ValueType::Time => {
                Some(f64::from_le_bytes(self.bytes[0..8].try_into().unwrap()))
            }
            ValueType::F32 => Some(f32::from_le_bytes(self.bytes[0..4].try_into().unwrap()) as f64),
            ValueType::U8 => Some(self.bytes[0] as f64),
            ValueType::I8 => Some(self.bytes[0] as i8 as f64),
            ValueType::U16 => Some(u16::from_le_bytes(self.bytes[0..2].try_into().unwrap()) as f64),
            ValueType::I16 => Some(i16::from_le_bytes(self.bytes[0..2].try_into().unwrap()) as f64),
            ValueType::U32 => Some(u32::from_le_bytes(self.bytes[0..4].try_into().unwrap()) as f64),
            ValueType::I32 => Some(i32::from_le_bytes(self.bytes[0..4].try_into().unwrap()) as f64),
            ValueType::U64 => Some(u64::from_le_bytes(self.bytes[0..8].try_into().unwrap()) as f64),
            ValueType::I64 => Some(i64::from_le_bytes(self.bytes[0..8].try_into().unwrap()) as f64),
            _ => None,
        }
    }

    pub fn is_fill(&self) -> bool {
        self.as_bytes() == self.vt.fill_bytes().as_slice()
    }

    /// Parse a das text field into a typed `Datum` (spec §3 "parse/format
    /// helpers").
    pub fn parse(vt: ValueType, units: UnitId, text: &str) -> Result<Self> {
        match vt {
            ValueType::F32 => {
                let v: f32 = text.trim().parse().map_err(|_| {
                    DasError::InvalidArgument(format!("cannot parse '{text}' as f32"))
                })?;
                Self::from_bytes(vt, units, &v.to_le_bytes())
            }
            ValueType::F64 | ValueType::Time => {
                let v: f64 = text.trim().parse().map_err(|_| {
                    DasError::InvalidArgument(format!("cannot parse '{text}' as f64"))
                })?;
                Self::from_bytes(vt, units, &v.to_le_bytes())
            }
            ValueType::U8 => Ok(Self::from_bytes(vt, units, &[text.trim().parse::<u8>().map_err(
                |_| DasError::InvalidArgument(format!("cannot parse '{text}' as u8")),
            )?])?),
            ValueType::I8 => Ok(Self::from_bytes(
                vt,
                units,
                &(text.trim().parse::<i8>().map_err(|_| {
                    DasError::InvalidArgument(format!("cannot parse '{text}' as i8"))
                })? as u8)
                    .to_le_bytes(),
            )?),
            ValueType::U16 => Self::from_bytes(
                vt,
                units,
                &text
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| DasError::InvalidArgument(format!("cannot parse '{text}' as u16")))?
                    .to_le_bytes(),
            ),
            ValueType::I16 => Self::from_bytes(
                vt,
                units,
                &text
                    .trim()
                    .parse::<i16>()
                    .map_err(|_| DasError::InvalidArgument(format!("cannot parse '{text}' as i16")))?
                    .to_le_bytes(),
            ),
            ValueType::U32 => Self::from_bytes(
                vt,
                units,
                &text
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| DasError::InvalidArgument(format!("cannot parse '{text}' as u32")))?
                    .to_le_bytes(),
            ),
            ValueType::I32 => Self::from_bytes(
                vt,
                units,
                &text
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| DasError::InvalidArgument(format!("cannot parse '{text}' as i32")))?
                    .to_le_bytes(),
            ),
            ValueType::U64 => Self::from_bytes(
                vt,
                units,
                &text
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| DasError::InvalidArgument(format!("cannot parse '{text}' as u64")))?
                    .to_le_bytes(),
            ),
            ValueType::I64 => Self::from_bytes(
                vt,
                units,
                &text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| DasError::InvalidArgument(format!("cannot parse '{text}' as i64")))?
                    .to_le_bytes(),
            ),
            ValueType::Text => Self::from_bytes(vt, units, text.as_bytes()),
            _ => Err(DasError::NotImplemented(format!("parse for {vt:?}"))),
        }
    }

    pub fn format(&self) -> String {
        match self.vt {
            ValueType::Text => String::from_utf8_lossy(self.as_bytes()).into_owned(),
            ValueType::Time => {
                let secs = self.as_f64().unwrap_or(f64::NAN);
                format!("{secs}")
            }
            _ => self
                .as_f64()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<unformattable>".to_string()),
        }
    }

    /// Encode a broken-down time as a `Time` datum whose inline value is
    /// seconds relative to `epoch_jd` (the caller's chosen units' reference
    /// Julian day — see [`crate::units::UnitsTable::epoch_julian_day`]).
    pub fn from_broken_down_time(units: UnitId, bdt: BrokenDownTime, epoch_jd: f64) -> Self {
        Self::f64(ValueType::Time, units, bdt.seconds_since_epoch_jd(epoch_jd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitsTable;

    #[test]
    fn byte_sizes_match_spec_primitives() {
        assert_eq!(ValueType::U8.byte_size(), 1);
        assert_eq!(ValueType::I64.byte_size(), 8);
        assert_eq!(ValueType::F32.byte_size(), 4);
    }

    #[test]
    fn fill_is_detected() {
        let units = UnitsTable::new();
        let u = units.dimensionless();
        let d = Datum::from_bytes(ValueType::U8, u, &ValueType::U8.fill_bytes()).unwrap();
        assert!(d.is_fill());
        let d2 = Datum::from_bytes(ValueType::U8, u, &[1u8]).unwrap();
        assert!(!d2.is_fill());
    }

    #[test]
    fn parse_and_format_round_trip_f64() {
        let units = UnitsTable::new();
        let u = units.dimensionless();
        let d = Datum::parse(ValueType::F64, u, "3.5").unwrap();
        assert_eq!(d.format(), "3.5");
    }

    #[test]
    fn parse_rejects_garbage() {
        let units = UnitsTable::new();
        let u = units.dimensionless();
        assert!(Datum::parse(ValueType::F64, u, "not-a-number").is_err());
    }

    #[test]
    fn cmp_bytes_orders_integers() {
        use std::cmp::Ordering;
        let a = 3u32.to_le_bytes();
        let b = 9u32.to_le_bytes();
        assert_eq!(ValueType::U32.cmp_bytes(&a, &b), Ordering::Less);
    }
}
