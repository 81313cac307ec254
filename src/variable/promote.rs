//! Type promotion and unit-merge rules for `BinaryOp` construction (spec
//! §4.2.1).

use crate::error::{DasError, Result};
use crate::units::UnitsTable;
use crate::units::UnitId;
use crate::value::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
}

impl OpKind {
    fn is_additive(self) -> bool {
        matches!(self, OpKind::Add | OpKind::Sub)
    }
}

pub struct Promoted {
    pub vt: ValueType,
    pub out_units: UnitId,
    /// Multiplicative conversion applied to the right operand (after
    /// promotion to `f64`) before combining.
    pub right_scale: f64,
}

fn is_short(vt: ValueType) -> bool {
    matches!(vt, ValueType::U8 | ValueType::I8 | ValueType::U16 | ValueType::I16 | ValueType::U32 | ValueType::I32 | ValueType::F32)
}

/// Promote the output value type for a `BinaryOp` (spec §4.2.1):
/// * both operands "short" (≤4-byte int or f32) -> `f32`;
/// * otherwise both non-time -> `f64`;
/// * `time ± duration -> time`; `time - time -> duration (f64 seconds)`;
/// * any other `time` combination is illegal.
fn promote_type(op: OpKind, lt: ValueType, rt: ValueType) -> Result<ValueType> {
    let l_time = lt == ValueType::Time;
    let r_time = rt == ValueType::Time;
    match (l_time, r_time) {
        (false, false) => {
            if is_short(lt) && is_short(rt) {
                Ok(ValueType::F32)
            } else {
                Ok(ValueType::F64)
            }
        }
        (true, false) if op.is_additive() => Ok(ValueType::Time),
        (true, true) if op == OpKind::Sub => Ok(ValueType::F64),
        _ => Err(DasError::ValueTypeIncompatible(
            "illegal time/non-time combination in binary op".into(),
        )),
    }
}

/// Promote the units and compute the right-hand scale factor (spec
/// §4.2.1 "Unit merging").
pub fn promote_binary_op(
    units: &mut UnitsTable,
    op: OpKind,
    lt: ValueType,
    lu: UnitId,
    rt: ValueType,
    ru: UnitId,
) -> Result<Promoted> {
    let vt = promote_type(op, lt, rt)?;
    match op {
        OpKind::Add | OpKind::Sub => {
            if !units.can_convert(ru, lu) {
                return Err(DasError::UnitIncompatible {
                    from: units.get(ru).unwrap_or("?").to_string(),
                    to: units.get(lu).unwrap_or("?").to_string(),
                });
            }
            if units.have_cal_rep(lu) && units.have_cal_rep(ru) {
                let out_units = units.interval(lu)?;
                // Both sides convert to the interval unit; the right-hand
                // scale folds that conversion into a single multiplicative
                // factor applied after promoting to f64 (1-unit probe).
                let right_scale = units.convert_to(out_units, 1.0, ru)?;
                Ok(Promoted { vt, out_units, right_scale })
            } else {
                let right_scale = units.convert_to(lu, 1.0, ru)?;
                Ok(Promoted { vt, out_units: lu, right_scale })
            }
        }
        OpKind::Mul => {
            let out_units = units.multiply(lu, ru)?;
            Ok(Promoted { vt, out_units, right_scale: 1.0 })
        }
        OpKind::Div => {
            let out_units = units.divide(lu, ru)?;
            Ok(Promoted { vt, out_units, right_scale: 1.0 })
        }
    }
}
