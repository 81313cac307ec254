//! The shape-entry enumeration shared by the array and variable layers
//! (spec §4.1 "shape(out)", §4.2.2 "Shape merge rules").
//!
//! `Array::shape` and `Variable::shape` both report, per external axis, one
//! of: a finite length, `RAGGED` (-1), `FUNC` (-2, for computed variables),
//! or `UNUSED` (-3, a broadcast axis the variable ignores).

/// One axis's reported length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimLen {
    Finite(u32),
    Ragged,
    Func,
    Unused,
}

impl DimLen {
    /// The wire/legacy integer encoding: non-negative length, or the
    /// sentinel values named in spec §4.1.
    pub fn as_i64(self) -> i64 {
        match self {
            DimLen::Finite(n) => n as i64,
            DimLen::Ragged => -1,
            DimLen::Func => -2,
            DimLen::Unused => -3,
        }
    }

    pub fn is_ragged(self) -> bool {
        matches!(self, DimLen::Ragged)
    }

    /// Merge rule for one external axis across two shape vectors (spec
    /// §4.2.2), commutative:
    /// * `RAGGED` dominates everything.
    /// * A finite number with another finite number -> the smaller.
    /// * `FUNC` dominates `UNUSED`.
    /// * `UNUSED` is the identity.
    pub fn merge(self, other: DimLen) -> DimLen {
        use DimLen::*;
        match (self, other) {
            (Ragged, _) | (_, Ragged) => Ragged,
            (Finite(a), Finite(b)) => Finite(a.min(b)),
            (Finite(a), Unused) | (Unused, Finite(a)) => Finite(a),
            (Finite(_), Func) => self,
            (Func, Finite(_)) => other,
            (Func, Unused) | (Unused, Func) => Func,
            (Func, Func) => Func,
            (Unused, Unused) => Unused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DimLen::*;

    #[test]
    fn ragged_dominates() {
        assert_eq!(Ragged.merge(Finite(5)), Ragged);
        assert_eq!(Finite(5).merge(Ragged), Ragged);
        assert_eq!(Ragged.merge(Unused), Ragged);
        assert_eq!(Func.merge(Ragged), Ragged);
    }

    #[test]
    fn finite_takes_smaller() {
        assert_eq!(Finite(3).merge(Finite(7)), Finite(3));
        assert_eq!(Finite(7).merge(Finite(3)), Finite(3));
    }

    #[test]
    fn unused_is_identity() {
        assert_eq!(Unused.merge(Finite(4)), Finite(4));
        assert_eq!(Finite(4).merge(Unused), Finite(4));
        assert_eq!(Unused.merge(Unused), Unused);
        assert_eq!(Unused.merge(Func), Func);
    }

    #[test]
    fn func_dominates_unused() {
        assert_eq!(Func.merge(Unused), Func);
        assert_eq!(Unused.merge(Func), Func);
    }

    #[test]
    fn merge_is_commutative() {
        let vals = [Finite(2), Finite(9), Ragged, Func, Unused];
        for &a in &vals {
            for &b in &vals {
                assert_eq!(a.merge(b), b.merge(a));
            }
        }
    }

    #[test]
    fn as_i64_sentinels() {
        assert_eq!(Ragged.as_i64(), -1);
        assert_eq!(Func.as_i64(), -2);
        assert_eq!(Unused.as_i64(), -3);
        assert_eq!(Finite(42).as_i64(), 42);
    }
}
