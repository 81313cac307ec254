//! Variable graph layer (spec §4.2): a reference-counted, polymorphic
//! `Variable` mapping a dataset's external index space onto backing
//! arrays, constants, affine sequences, and pointwise operators.

pub mod promote;
pub mod vector;

use std::fmt;
use std::rc::Rc;

use crate::array::{Array, ArrayFlags};
use crate::error::{DasError, Result};
use crate::shape::DimLen;
use crate::units::{UnitId, UnitsTable};
use crate::value::{Datum, Semantic, ValueType};

pub use promote::{promote_binary_op, OpKind};
pub use vector::VectorOverlay;

/// `UNUSED` external-index-map sentinel (spec §3 "Array" variant: "entries
/// may be `UNUSED`").
pub const UNUSED_AXIS: i8 = -1;

/// Common header shared by every variant (spec §3 "Variable").
#[derive(Debug, Clone)]
pub struct VarHeader {
    pub vt: ValueType,
    pub units: UnitId,
    pub extrank: u8,
    pub intrank: u8,
    pub semantic: Semantic,
}

#[derive(Debug, Clone)]
pub struct SequenceInner {
    pub header: VarHeader,
    /// `b`: intercept, in `header.units`.
    pub intercept: Datum,
    /// `m`: slope per unit step of `axis`. For time sequences this is
    /// pre-scaled to seconds per spec §4.2 `get`.
    pub slope: f64,
    /// The external index this sequence is affine on.
    pub axis: u8,
}

#[derive(Debug, Clone)]
pub struct ArrayVarInner {
    pub header: VarHeader,
    pub array: Rc<Array>,
    /// Length `header.extrank`; entry `d` is either [`UNUSED_AXIS`] or the
    /// target array axis for external index `d`.
    pub index_map: Vec<i8>,
    pub vector: Option<VectorOverlay>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Abs,
    Sqrt,
    Ln,
    Exp,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Abs => "abs",
            UnaryOperator::Sqrt => "sqrt",
            UnaryOperator::Ln => "ln",
            UnaryOperator::Exp => "exp",
        };
        f.write_str(s)
    }
}

pub struct UnaryOpInner {
    pub header: VarHeader,
    pub op: UnaryOperator,
    pub child: Rc<Variable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        };
        f.write_str(s)
    }
}

pub struct BinaryOpInner {
    pub header: VarHeader,
    pub op: BinaryOperator,
    pub left: Rc<Variable>,
    pub right: Rc<Variable>,
    /// Multiplicative conversion from right units to the units the
    /// operation expects, applied at every `get` after promoting both
    /// operands to `f64` (spec §4.2.1).
    pub right_scale: f64,
}

/// The five variants of spec §3 "Variable", each carrying a [`VarHeader`].
pub enum Variable {
    Const(Datum),
    Sequence(SequenceInner),
    ArrayVar(ArrayVarInner),
    UnaryOp(UnaryOpInner),
    BinaryOp(BinaryOpInner),
}

impl Variable {
    /// The variant's common header. `Const` has no standalone header (it's
    /// just a `Datum`); callers needing its type/units/extrank should use
    /// [`Variable::value_type`]/[`Variable::units`]/[`Variable::extrank`]
    /// instead, which handle `Const` directly.
    fn header(&self) -> Option<&VarHeader> {
        match self {
            Variable::Const(_) => None,
            Variable::Sequence(s) => Some(&s.header),
            Variable::ArrayVar(a) => Some(&a.header),
            Variable::UnaryOp(u) => Some(&u.header),
            Variable::BinaryOp(b) => Some(&b.header),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Variable::Const(d) => d.vt,
            other => other.header().unwrap().vt,
        }
    }

    pub fn units(&self) -> UnitId {
        match self {
            Variable::Const(d) => d.units,
            other => other.header().unwrap().units,
        }
    }

    pub fn extrank(&self) -> u8 {
        match self {
            Variable::Const(_) => 0,
            Variable::Sequence(s) => s.axis + 1,
            other => other.header().unwrap().extrank,
        }
    }

    /// `get(external_idx, out_datum)` (spec §4.2 "Uniform contract").
    pub fn get(&self, idx: &[i64]) -> Result<Datum> {
        match self {
            Variable::Const(d) => Ok(*d),
            Variable::Sequence(s) => {
                let d = *idx.get(s.axis as usize).ok_or_else(|| {
                    DasError::InvalidArgument("sequence index missing dependent axis".into())
                })?;
                let base = s.intercept.as_f64().ok_or_else(|| {
                    DasError::ValueTypeIncompatible("sequence intercept is not numeric".into())
                })?;
                let value = base + s.slope * d as f64;
                Ok(Datum::f64(s.header.vt, s.header.units, value))
            }
            Variable::ArrayVar(a) => {
                if idx.len() != a.header.extrank as usize {
                    return Err(DasError::InvalidArgument(
                        "external index rank does not match variable extrank".into(),
                    ));
                }
                let mut array_idx = Vec::with_capacity(a.index_map.len());
                for (d, &target) in a.index_map.iter().enumerate() {
                    if target != UNUSED_AXIS {
                        array_idx.push(idx[d]);
                    }
                }
                match &a.vector {
                    None => {
                        let bytes = a.array.element_at(&array_idx)?;
                        Datum::from_bytes(a.header.vt, a.header.units, &bytes)
                    }
                    Some(overlay) => {
                        let (start, count) = a.array.get_at(&array_idx)?;
                        let n = (overlay.component_count as usize).min(count);
                        let raw = a.array.read_run(start, n)?;
                        let elem_size = a.array.value_type().byte_size();
                        let mut components = [0.0f64; 4];
                        for i in 0..n {
                            let slice = &raw[i * elem_size..(i + 1) * elem_size];
                            components[i] = Datum::from_bytes(a.array.value_type(), a.header.units, slice)?
                                .as_f64()
                                .ok_or_else(|| {
                                    DasError::ValueTypeIncompatible(
                                        "vector component is not numeric".into(),
                                    )
                                })?;
                        }
                        let vec3 = crate::value::GeoVec {
                            components,
                            n: n as u8,
                            frame_id: overlay.frame_id,
                            order: overlay.directions,
                        };
                        Datum::from_bytes(ValueType::GeoVec, a.header.units, &vec3.to_bytes())
                    }
                }
            }
            Variable::UnaryOp(u) => {
                let child = u.child.get(idx)?;
                apply_unary(u.op, u.header.vt, u.header.units, &child)
            }
            Variable::BinaryOp(b) => {
                let l = b.left.get(idx)?;
                let r = b.right.get(idx)?;
                let lf = l.as_f64().ok_or_else(|| {
                    DasError::ValueTypeIncompatible("binary operand is not numeric".into())
                })?;
                let rf = r.as_f64().ok_or_else(|| {
                    DasError::ValueTypeIncompatible("binary operand is not numeric".into())
                })? * b.right_scale;
                let out = match b.op {
                    BinaryOperator::Add => lf + rf,
                    BinaryOperator::Sub => lf - rf,
                    BinaryOperator::Mul => lf * rf,
                    BinaryOperator::Div => lf / rf,
                };
                Ok(Datum::f64(b.header.vt, b.header.units, out))
            }
        }
    }

    /// `shape(out)` (spec §4.2, merge rules of §4.2.2).
    pub fn shape(&self) -> Vec<DimLen> {
        match self {
            Variable::Const(_) => Vec::new(),
            Variable::Sequence(s) => {
                let rank = s.axis as usize + 1;
                let mut out = vec![DimLen::Unused; rank];
                out[s.axis as usize] = DimLen::Func;
                out
            }
            Variable::ArrayVar(a) => {
                let array_shape = a.array.shape();
                a.index_map
                    .iter()
                    .map(|&target| {
                        if target == UNUSED_AXIS {
                            DimLen::Unused
                        } else {
                            array_shape.get(target as usize).copied().unwrap_or(DimLen::Unused)
                        }
                    })
                    .collect()
            }
            Variable::UnaryOp(u) => u.child.shape(),
            Variable::BinaryOp(b) => merge_shapes(&b.left.shape(), &b.right.shape()),
        }
    }

    /// `length_in(nIdx, partial_loc)` (spec §4.2).
    pub fn length_in(&self, idx: &[i64]) -> Result<DimLen> {
        match self {
            Variable::Const(_) => Err(DasError::InvalidArgument("Const has no axes".into())),
            Variable::Sequence(s) => {
                let d = idx.len();
                if d == s.axis as usize {
                    Ok(DimLen::Func)
                } else {
                    Ok(DimLen::Unused)
                }
            }
            Variable::ArrayVar(a) => {
                // Map the partial external-index prefix to the array's
                // partial index by dropping UNUSED axes, per spec §4.2
                // `length_in`.
                let mut array_idx = Vec::new();
                for (d, &target) in a.index_map.iter().enumerate() {
                    if d >= idx.len() {
                        break;
                    }
                    if target != UNUSED_AXIS {
                        array_idx.push(idx[d]);
                    }
                }
                let n = a.array.length_in(&array_idx)?;
                Ok(DimLen::Finite(n as u32))
            }
            Variable::UnaryOp(u) => u.child.length_in(idx),
            Variable::BinaryOp(b) => {
                let l = b.left.length_in(idx)?;
                let r = b.right.length_in(idx)?;
                Ok(l.merge(r))
            }
        }
    }

    /// `is_fill(bytes, value_type)` (spec §4.2).
    pub fn is_fill(&self, bytes: &[u8]) -> bool {
        match self {
            Variable::Const(d) => d.is_fill(),
            Variable::ArrayVar(a) => bytes == a.header.vt.fill_bytes(),
            Variable::UnaryOp(u) => u.child.is_fill(bytes),
            Variable::BinaryOp(b) => {
                // composites: fill if *either* side reports fill (spec §4.2).
                let lf = b.left.value_type().fill_bytes();
                let rf = b.right.value_type().fill_bytes();
                bytes == lf || bytes == rf
            }
            Variable::Sequence(s) => bytes == s.header.vt.fill_bytes(),
        }
    }

    /// Construct a `Const` whose header this module doesn't need, since
    /// `Const` is just a `Datum` — see [`Variable::Const`]. Kept as a
    /// named constructor for symmetry with the other variants.
    pub fn constant(d: Datum) -> Rc<Variable> {
        Rc::new(Variable::Const(d))
    }

    pub fn sequence(vt: ValueType, out_units: UnitId, intercept: Datum, slope: f64, axis: u8) -> Rc<Variable> {
        Rc::new(Variable::Sequence(SequenceInner {
            header: VarHeader { vt, units: out_units, extrank: axis + 1, intrank: 0, semantic: vt.semantic() },
            intercept,
            slope,
            axis,
        }))
    }

    pub fn from_array(array: Rc<Array>, index_map: Vec<i8>, vector: Option<VectorOverlay>) -> Rc<Variable> {
        let extrank = index_map.len() as u8;
        let intrank = if vector.is_some() { 1 } else { 0 };
        let vt = array.value_type();
        let units = array.units();
        Rc::new(Variable::ArrayVar(ArrayVarInner {
            header: VarHeader { vt, units, extrank, intrank, semantic: vt.semantic() },
            array,
            index_map,
            vector,
        }))
    }

    pub fn unary(op: UnaryOperator, child: Rc<Variable>) -> Rc<Variable> {
        let vt = child.value_type();
        let units = child.units();
        let header = VarHeader { vt, units, extrank: child.extrank(), intrank: 0, semantic: vt.semantic() };
        Rc::new(Variable::UnaryOp(UnaryOpInner { header, op, child }))
    }

    /// Build a `BinaryOp`, computing the type-promotion and unit-merge
    /// results once at construction (spec §4.2.1).
    pub fn binary(units: &mut UnitsTable, op: BinaryOperator, left: Rc<Variable>, right: Rc<Variable>) -> Result<Rc<Variable>> {
        let kind = match op {
            BinaryOperator::Add => OpKind::Add,
            BinaryOperator::Sub => OpKind::Sub,
            BinaryOperator::Mul => OpKind::Mul,
            BinaryOperator::Div => OpKind::Div,
        };
        let promoted = promote_binary_op(units, kind, left.value_type(), left.units(), right.value_type(), right.units())?;
        let extrank = left.extrank().max(right.extrank());
        let header = VarHeader {
            vt: promoted.vt,
            units: promoted.out_units,
            extrank,
            intrank: 0,
            semantic: promoted.vt.semantic(),
        };
        Ok(Rc::new(Variable::BinaryOp(BinaryOpInner {
            header,
            op,
            left,
            right,
            right_scale: promoted.right_scale,
        })))
    }

    /// `subset(min, max)` (spec §4.2 "Uniform contract"): a newly
    /// allocated, owning `Array` covering the dense external range
    /// `[min, max)`. A rank-1 `ArrayVar` with an identity index map fully
    /// within the backing array's valid range is bulk-copied via
    /// [`Array::read_run`]; every other case (ragged backing, a
    /// reordering/partial index map, or a range extending past valid
    /// data) walks each index in the range and substitutes fill bytes for
    /// any position `get` reports missing.
    pub fn subset(&self, min: &[i64], max: &[i64]) -> Result<Array> {
        if min.len() != max.len() {
            return Err(DasError::InvalidArgument("subset min/max must have the same length".into()));
        }
        if min.is_empty() {
            if self.extrank() != 0 {
                return Err(DasError::InvalidArgument("subset min/max rank does not match variable extrank".into()));
            }
            let out = Array::new(self.value_type(), self.units(), 1, vec![], ArrayFlags::PLAIN)?;
            let d = self.get(&[])?;
            out.append(d.as_bytes(), 1)?;
            return Ok(out);
        }
        if min.len() != self.extrank() as usize {
            return Err(DasError::InvalidArgument("subset min/max rank does not match variable extrank".into()));
        }
        let rank = min.len();
        let mut dims = Vec::with_capacity(rank);
        for d in 0..rank {
            if max[d] <= min[d] {
                return Err(DasError::InvalidArgument("subset max must exceed min on every axis".into()));
            }
            dims.push((max[d] - min[d]) as u32);
        }

        if rank == 1 {
            if let Variable::ArrayVar(a) = self {
                if a.vector.is_none() && a.array.rank() == 1 && a.index_map.as_slice() == [0] {
                    let valid = a.array.length_in(&[])? as i64;
                    if min[0] >= 0 && max[0] <= valid {
                        let (flat_start, _) = a.array.get_at(&[min[0]])?;
                        let bytes = a.array.read_run(flat_start, dims[0] as usize)?;
                        let out = Array::new(self.value_type(), self.units(), 1, vec![], ArrayFlags::PLAIN)?;
                        out.append(&bytes, dims[0] as usize)?;
                        return Ok(out);
                    }
                }
            }
        }

        let shape_hints = dims[1..].to_vec();
        let out = Array::new(self.value_type(), self.units(), rank as u8, shape_hints, ArrayFlags::PLAIN)?;
        let fill = self.value_type().fill_bytes();
        let mut idx = min.to_vec();
        subset_walk(self, &mut idx, min, max, 0, &out, &fill)?;
        Ok(out)
    }
}

/// Recursive row-major walk over `[min, max)`, filling `out` one element at
/// a time (the slow path of [`Variable::subset`]).
fn subset_walk(var: &Variable, idx: &mut [i64], min: &[i64], max: &[i64], depth: usize, out: &Array, fill: &[u8]) -> Result<()> {
    if depth == min.len() {
        let bytes = match var.get(idx) {
            Ok(d) => d.as_bytes().to_vec(),
            Err(DasError::NotFound(_)) => fill.to_vec(),
            Err(e) => return Err(e),
        };
        out.append(&bytes, 1)?;
        return Ok(());
    }
    for i in min[depth]..max[depth] {
        idx[depth] = i;
        subset_walk(var, idx, min, max, depth + 1, out, fill)?;
    }
    Ok(())
}

fn apply_unary(op: UnaryOperator, vt: ValueType, units: UnitId, d: &Datum) -> Result<Datum> {
    let v = d.as_f64().ok_or_else(|| {
        DasError::ValueTypeIncompatible("unary operand is not numeric".into())
    })?;
    let out = match op {
        UnaryOperator::Neg => -v,
        UnaryOperator::Abs => v.abs(),
        UnaryOperator::Sqrt => v.sqrt(),
        UnaryOperator::Ln => v.ln(),
        UnaryOperator::Exp => v.exp(),
    };
    Ok(Datum::f64(vt, units, out))
}

pub(crate) fn merge_shapes(a: &[DimLen], b: &[DimLen]) -> Vec<DimLen> {
    let rank = a.len().max(b.len());
    (0..rank)
        .map(|d| {
            let av = a.get(d).copied().unwrap_or(DimLen::Unused);
            let bv = b.get(d).copied().unwrap_or(DimLen::Unused);
            av.merge(bv)
        })
        .collect()
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Const(d) => write!(f, "{}", d.format()),
            Variable::Sequence(s) => write!(f, "({} + {}*idx{})", s.intercept.format(), s.slope, s.axis),
            Variable::ArrayVar(a) => write!(f, "array[{:?}]", a.index_map),
            Variable::UnaryOp(u) => write!(f, "{}({})", u.op, u.child),
            Variable::BinaryOp(b) => write!(f, "({} {} {})", b.left, b.op, b.right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitsTable;

    #[test]
    fn sequence_scenario_2() {
        let units = UnitsTable::new();
        let seconds = units.lookup("seconds").unwrap();
        // The dependent axis is 0; b is "0 seconds after the 1000us2000
        // base", m is 1 second/step, matching scenario 2's b=1000us2000,
        // m=1 second.
        let zero_base = Datum::f64(ValueType::F64, seconds, 0.0);
        let seq = Variable::sequence(ValueType::F64, seconds, zero_base, 1.0, 0);
        let got = seq.get(&[5, 999]).unwrap();
        assert_eq!(got.as_f64().unwrap(), 5.0);
    }

    #[test]
    fn binary_op_unit_scaling_scenario_3() {
        let mut units = UnitsTable::new();
        let km = units.lookup("km").unwrap();
        let m = units.lookup("m").unwrap();
        let l_array = Rc::new(Array::new(ValueType::F64, km, 1, vec![], crate::array::ArrayFlags::PLAIN).unwrap());
        l_array.append(&10.0f64.to_le_bytes(), 1).unwrap();
        let r_array = Rc::new(Array::new(ValueType::F64, m, 1, vec![], crate::array::ArrayFlags::PLAIN).unwrap());
        r_array.append(&500.0f64.to_le_bytes(), 1).unwrap();

        let l = Variable::from_array(l_array, vec![0], None);
        let r = Variable::from_array(r_array, vec![0], None);
        let v = Variable::binary(&mut units, BinaryOperator::Sub, l, r).unwrap();
        let got = v.get(&[0]).unwrap();
        assert!((got.as_f64().unwrap() - 9.5).abs() < 1e-9);
        assert_eq!(got.units, km);
    }

    #[test]
    fn binary_op_shape_merges_children() {
        let mut units = UnitsTable::new();
        let dimless = units.dimensionless();
        let l_array = Rc::new(Array::new(ValueType::F64, dimless, 1, vec![], crate::array::ArrayFlags::PLAIN).unwrap());
        l_array.append(&[1.0f64.to_le_bytes(), 2.0f64.to_le_bytes(), 3.0f64.to_le_bytes()].concat(), 3).unwrap();
        let r_array = Rc::new(Array::new(ValueType::F64, dimless, 1, vec![], crate::array::ArrayFlags::PLAIN).unwrap());
        r_array.append(&[1.0f64.to_le_bytes(), 2.0f64.to_le_bytes()].concat(), 2).unwrap();

        let l = Variable::from_array(l_array, vec![0], None);
        let r = Variable::from_array(r_array, vec![0], None);
        let v = Variable::binary(&mut units, BinaryOperator::Add, l, r).unwrap();
        assert_eq!(v.shape(), vec![DimLen::Finite(2)]);
    }

    #[test]
    fn unused_axis_is_identity_in_shape_merge() {
        assert_eq!(merge_shapes(&[DimLen::Unused], &[DimLen::Finite(4)]), vec![DimLen::Finite(4)]);
    }

    #[test]
    fn vector_overlay_assembles_geo_vec() {
        let units = UnitsTable::new();
        let dimless = units.dimensionless();
        // rank-2 backing array: outer (time) x inner (component).
        let backing = Rc::new(Array::new(ValueType::F64, dimless, 2, vec![3], crate::array::ArrayFlags::PLAIN).unwrap());
        let components = [1.0f64, 2.0, 3.0].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
        backing.append(&components, 3).unwrap();
        let overlay = vector::VectorOverlay::new(7, vector::CoordKind::Cartesian, 3, [0, 1, 2, 0]);
        let v = Variable::from_array(backing, vec![0, UNUSED_AXIS], Some(overlay));
        let got = v.get(&[0, 0]).unwrap();
        assert_eq!(got.vt, ValueType::GeoVec);
        let vec3 = crate::value::GeoVec::from_bytes(got.as_bytes()).unwrap();
        assert_eq!(vec3.components[0], 1.0);
        assert_eq!(vec3.components[2], 3.0);
        assert_eq!(vec3.n, 3);
        assert_eq!(vec3.frame_id, 7);
    }

    #[test]
    fn subset_rank1_uses_fast_path_and_copies_contiguous_run() {
        let units = UnitsTable::new();
        let dimless = units.dimensionless();
        let backing = Rc::new(Array::new(ValueType::F32, dimless, 1, vec![], ArrayFlags::PLAIN).unwrap());
        let values: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0, 5.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        backing.append(&values, 5).unwrap();
        let v = Variable::from_array(backing, vec![0], None);

        let out = v.subset(&[1], &[4]).unwrap();
        assert_eq!(out.rank(), 1);
        assert_eq!(out.length_in(&[]).unwrap(), 3);
        for (i, expected) in [2.0f32, 3.0, 4.0].iter().enumerate() {
            let bytes = out.element_at(&[i as i64]).unwrap();
            assert_eq!(f32::from_le_bytes(bytes.try_into().unwrap()), *expected);
        }
    }

    /// Spec §8: `subset(min,max)` returns an Array whose size equals
    /// `∏(max[d]-min[d])`; out-of-range positions on a ragged backing
    /// array are filled rather than causing the whole subset to fail.
    #[test]
    fn subset_rank2_ragged_fills_short_rows_and_matches_bounds_product() {
        let units = UnitsTable::new();
        let dimless = units.dimensionless();
        let backing = Rc::new(Array::new(ValueType::F32, dimless, 2, vec![0], ArrayFlags::PLAIN).unwrap());
        let row0: Vec<u8> = [1.0f32, 2.0, 3.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        backing.append(&row0, 3).unwrap();
        backing.mark_end(1).unwrap();
        let row1: Vec<u8> = 4.0f32.to_le_bytes().to_vec();
        backing.append(&row1, 1).unwrap();
        backing.mark_end(1).unwrap();

        let v = Variable::from_array(backing, vec![0, 1], None);
        let out = v.subset(&[0, 0], &[2, 3]).unwrap();

        let dims = [2usize, 3];
        let expected_size: usize = dims.iter().product();
        assert_eq!(out.shape(), vec![DimLen::Finite(2), DimLen::Finite(3)]);
        let mut total = 0usize;
        for i in 0..out.length_in(&[]).unwrap() {
            total += out.length_in(&[i as i64]).unwrap();
        }
        assert_eq!(total, expected_size);

        assert_eq!(f32::from_le_bytes(out.element_at(&[0, 0]).unwrap().try_into().unwrap()), 1.0);
        assert_eq!(f32::from_le_bytes(out.element_at(&[0, 2]).unwrap().try_into().unwrap()), 3.0);
        assert_eq!(f32::from_le_bytes(out.element_at(&[1, 0]).unwrap().try_into().unwrap()), 4.0);
        assert!(f32::from_le_bytes(out.element_at(&[1, 1]).unwrap().try_into().unwrap()).is_nan());
        assert!(f32::from_le_bytes(out.element_at(&[1, 2]).unwrap().try_into().unwrap()).is_nan());
    }

    #[test]
    fn subset_rejects_mismatched_bounds_rank() {
        let units = UnitsTable::new();
        let dimless = units.dimensionless();
        let backing = Rc::new(Array::new(ValueType::F32, dimless, 1, vec![], ArrayFlags::PLAIN).unwrap());
        backing.append(&1.0f32.to_le_bytes(), 1).unwrap();
        let v = Variable::from_array(backing, vec![0], None);
        assert!(v.subset(&[0, 0], &[1, 1]).is_err());
    }
}
