//! Units layer: a singleton-interned string table of physical units with a
//! small algebra (spec §4.4).
//!
//! The interning table is a direct transform of the teacher's
//! `StringTableV2` (`storage_v2/string_table.rs`): write-time dedup via a
//! `HashMap`, O(1) index lookup via an `(offset, length)` entries vector.
//! Units additionally carry a parsed SI-dimension vector and an optional
//! epoch record, which `StringTableV2` had no equivalent of.

use std::collections::HashMap;

use crate::error::{DasError, Result};

/// An interned unit string's id. `0` is always "dimensionless".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

/// The seven base SI dimensions used to decide `can_convert` for non-epoch
/// units: length, mass, time, current, temperature, amount, luminosity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SiDim([i8; 7]);

impl SiDim {
    const LEN: usize = 0;
    const TIME: usize = 2;

    fn length(power: i8) -> Self {
        let mut d = [0i8; 7];
        d[Self::LEN] = power;
        SiDim(d)
    }
    fn time(power: i8) -> Self {
        let mut d = [0i8; 7];
        d[Self::TIME] = power;
        SiDim(d)
    }
    fn dimensionless() -> Self {
        SiDim([0; 7])
    }
    fn mul(self, other: SiDim) -> SiDim {
        let mut out = [0i8; 7];
        for i in 0..7 {
            out[i] = self.0[i] + other.0[i];
        }
        SiDim(out)
    }
    fn pow(self, p: i8) -> SiDim {
        let mut out = [0i8; 7];
        for i in 0..7 {
            out[i] = self.0[i] * p;
        }
        SiDim(out)
    }
}

/// A recognised epoch: the SI-seconds scale factor to convert a raw value
/// in this unit into seconds, plus the epoch's reference Julian day (spec
/// §4.4 "epoch units").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochInfo {
    pub seconds_per_unit: f64,
    pub epoch_julian_day: f64,
}

struct UnitEntry {
    dim: SiDim,
    /// Multiplicative factor to convert 1 of this unit into the SI base
    /// unit for its dimension (e.g. "km" -> 1000.0 meters).
    si_factor: f64,
    epoch: Option<EpochInfo>,
}

/// Singleton-interned string table of physical units plus their algebra
/// (spec §4.4).
pub struct UnitsTable {
    data: Vec<u8>,
    entries: Vec<(u32, u32)>,
    index: HashMap<String, UnitId>,
    meta: Vec<UnitEntry>,
}

const T2000_JD: f64 = 2451544.5; // 2000-01-01T00:00:00 UTC
const T1970_JD: f64 = 2440587.5; // 1970-01-01T00:00:00 UTC
const MJ1958_JD: f64 = 2436204.5; // 1958-01-01T00:00:00 UTC

impl UnitsTable {
    pub fn new() -> Self {
        let mut t = UnitsTable {
            data: Vec::new(),
            entries: Vec::new(),
            index: HashMap::new(),
            meta: Vec::new(),
        };
        // Index 0: dimensionless, always present.
        t.register("", SiDim::dimensionless(), 1.0, None);
        t.register("seconds", SiDim::time(1), 1.0, None);
        t.register("milliseconds", SiDim::time(1), 1e-3, None);
        t.register("microseconds", SiDim::time(1), 1e-6, None);
        t.register("hours", SiDim::time(1), 3600.0, None);
        t.register("days", SiDim::time(1), 86400.0, None);
        t.register("m", SiDim::length(1), 1.0, None);
        t.register("km", SiDim::length(1), 1000.0, None);
        t.register(
            "us2000",
            SiDim::time(1),
            1e-6,
            Some(EpochInfo { seconds_per_unit: 1e-6, epoch_julian_day: T2000_JD }),
        );
        t.register(
            "t2000",
            SiDim::time(1),
            1.0,
            Some(EpochInfo { seconds_per_unit: 1.0, epoch_julian_day: T2000_JD }),
        );
        t.register(
            "t1970",
            SiDim::time(1),
            1.0,
            Some(EpochInfo { seconds_per_unit: 1.0, epoch_julian_day: T1970_JD }),
        );
        t.register(
            "mj1958",
            SiDim::time(1),
            86400.0,
            Some(EpochInfo { seconds_per_unit: 86400.0, epoch_julian_day: MJ1958_JD }),
        );
        t.register(
            "UTC",
            SiDim::time(1),
            1.0,
            Some(EpochInfo { seconds_per_unit: 1.0, epoch_julian_day: T2000_JD }),
        );
        t
    }

    fn register(&mut self, unit: &str, dim: SiDim, si_factor: f64, epoch: Option<EpochInfo>) -> UnitId {
        let id = self.intern(unit);
        // Only set metadata the first time (built-ins are registered once
        // at construction, before any user unit can collide).
        if self.meta.len() == id.0 as usize {
            self.meta.push(UnitEntry { dim, si_factor, epoch });
        }
        id
    }

    /// Intern a unit string, returning its id. Matches `StringTableV2`'s
    /// write-time dedup semantics exactly.
    pub fn intern(&mut self, s: &str) -> UnitId {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let offset = self.data.len() as u32;
        let length = s.len() as u32;
        let id = UnitId(self.entries.len() as u32);
        self.data.extend_from_slice(s.as_bytes());
        self.entries.push((offset, length));
        self.index.insert(s.to_string(), id);
        // A unit interned outside `register` (e.g. an unrecognised unit
        // parsed off the wire) gets dimensionless/SI-factor-1 metadata;
        // `can_convert` against it will only succeed for exact-text
        // identity unless the caller later augments the table.
        if self.meta.len() == id.0 as usize {
            self.meta.push(UnitEntry { dim: SiDim::dimensionless(), si_factor: 1.0, epoch: None });
        }
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&str> {
        let (offset, length) = *self.entries.get(id.0 as usize)?;
        std::str::from_utf8(&self.data[offset as usize..(offset + length) as usize]).ok()
    }

    pub fn dimensionless(&self) -> UnitId {
        UnitId(0)
    }

    pub fn lookup(&self, unit: &str) -> Option<UnitId> {
        self.index.get(unit).copied()
    }

    pub fn have_cal_rep(&self, u: UnitId) -> bool {
        self.meta.get(u.0 as usize).map(|m| m.epoch.is_some()).unwrap_or(false)
    }

    /// The duration unit corresponding to an epoch (spec §4.4 "interval").
    /// `us2000 -> microseconds`, any other recognised epoch -> `seconds`.
    pub fn interval(&mut self, u: UnitId) -> Result<UnitId> {
        let name = self.get(u).ok_or_else(|| DasError::InvalidArgument("unknown unit".into()))?.to_string();
        if !self.have_cal_rep(u) {
            return Err(DasError::UnitIncompatible { from: name, to: "<duration>".into() });
        }
        Ok(if name == "us2000" {
            self.lookup("microseconds").unwrap()
        } else {
            self.lookup("seconds").unwrap()
        })
    }

    pub fn epoch_info(&self, u: UnitId) -> Option<EpochInfo> {
        self.meta.get(u.0 as usize).and_then(|m| m.epoch)
    }

    /// True if both are epochs, both reduce to the same SI dimension, or a
    /// built-in conversion table supplies a factor (spec §4.4).
    pub fn can_convert(&self, a: UnitId, b: UnitId) -> bool {
        if a == b {
            return true;
        }
        let (ma, mb) = match (self.meta.get(a.0 as usize), self.meta.get(b.0 as usize)) {
            (Some(ma), Some(mb)) => (ma, mb),
            _ => return false,
        };
        if ma.epoch.is_some() && mb.epoch.is_some() {
            return true;
        }
        if ma.epoch.is_some() != mb.epoch.is_some() {
            return false;
        }
        ma.dim == mb.dim
    }

    /// Scaled value for finite units, or the offset relative to the target
    /// epoch for epoch units (spec §4.4 "convertTo").
    pub fn convert_to(&self, target: UnitId, value: f64, source: UnitId) -> Result<f64> {
        if !self.can_convert(source, target) {
            return Err(DasError::UnitIncompatible {
                from: self.get(source).unwrap_or("?").to_string(),
                to: self.get(target).unwrap_or("?").to_string(),
            });
        }
        let ms = &self.meta[source.0 as usize];
        let mt = &self.meta[target.0 as usize];
        match (ms.epoch, mt.epoch) {
            (Some(es), Some(et)) => {
                let seconds_from_source_epoch = value * es.seconds_per_unit;
                let epoch_delta_seconds = (es.epoch_julian_day - et.epoch_julian_day) * 86400.0;
                let seconds_from_target_epoch = seconds_from_source_epoch + epoch_delta_seconds;
                Ok(seconds_from_target_epoch / et.seconds_per_unit)
            }
            _ => Ok(value * ms.si_factor / mt.si_factor),
        }
    }

    pub fn multiply(&mut self, a: UnitId, b: UnitId) -> Result<UnitId> {
        self.combine(a, b, "*", 1)
    }

    pub fn divide(&mut self, a: UnitId, b: UnitId) -> Result<UnitId> {
        self.combine(a, b, "/", -1)
    }

    fn combine(&mut self, a: UnitId, b: UnitId, op: &str, b_power: i8) -> Result<UnitId> {
        let name_a = self.get(a).ok_or_else(|| DasError::InvalidArgument("unknown unit".into()))?.to_string();
        let name_b = self.get(b).ok_or_else(|| DasError::InvalidArgument("unknown unit".into()))?.to_string();
        let ma = &self.meta[a.0 as usize];
        let mb = &self.meta[b.0 as usize];
        let dim = ma.dim.mul(mb.dim.pow(b_power));
        let si_factor = if b_power > 0 { ma.si_factor * mb.si_factor } else { ma.si_factor / mb.si_factor };
        let combined_name = if name_b.is_empty() {
            name_a.clone()
        } else if name_a.is_empty() {
            if b_power > 0 { name_b.clone() } else { format!("1/{name_b}") }
        } else {
            format!("{name_a}{op}{name_b}")
        };
        let id = self.intern(&combined_name);
        self.meta[id.0 as usize] = UnitEntry { dim, si_factor, epoch: None };
        Ok(id)
    }

    pub fn power(&mut self, a: UnitId, p: i8) -> Result<UnitId> {
        let name_a = self.get(a).ok_or_else(|| DasError::InvalidArgument("unknown unit".into()))?.to_string();
        let ma = &self.meta[a.0 as usize];
        let dim = ma.dim.pow(p);
        let si_factor = ma.si_factor.powi(p as i32);
        let name = format!("{name_a}**{p}");
        let id = self.intern(&name);
        self.meta[id.0 as usize] = UnitEntry { dim, si_factor, epoch: None };
        Ok(id)
    }

    pub fn root(&mut self, a: UnitId, n: i8) -> Result<UnitId> {
        if n == 0 {
            return Err(DasError::InvalidArgument("root of degree 0".into()));
        }
        let name_a = self.get(a).ok_or_else(|| DasError::InvalidArgument("unknown unit".into()))?.to_string();
        let ma = &self.meta[a.0 as usize];
        if ma.dim.0.iter().any(|d| d % n != 0) {
            return Err(DasError::UnitIncompatible { from: name_a, to: format!("root^{n}") });
        }
        let mut divided = [0i8; 7];
        for i in 0..7 {
            divided[i] = ma.dim.0[i] / n;
        }
        let si_factor = ma.si_factor.powf(1.0 / n as f64);
        let name = format!("{name_a}**(1/{n})");
        let id = self.intern(&name);
        self.meta[id.0 as usize] = UnitEntry { dim: SiDim(divided), si_factor, epoch: None };
        Ok(id)
    }
}

impl Default for UnitsTable {
    fn default() -> Self {
        Self::new()
    }
}
