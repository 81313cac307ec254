//! Ragged multi-dimensional array layer (spec §4.1).
//!
//! An `Array` of rank `r` is backed by one [`buffer::ElementBuffer`] for the
//! fastest-varying dimension and `r - 1` [`buffer::IndexInfoBuffer`]s, one
//! per dimension above it. Dimension `d`'s buffer (`levels[d - 1]`) holds
//! `(offset, count)` pairs whose `offset` indexes into `levels[d]` (or, for
//! the last level, into the element buffer) and whose `count` is the number
//! of sub-items that belong to that cell.
//!
//! Subsets share the parent's buffers (`Rc<RefCell<_>>`) and narrow the
//! visible window into dimension 0 rather than copying — the single-thread
//! concurrency model (no `Send`/`Sync` needed; see [`crate::concurrency`])
//! makes `Rc<RefCell<_>>` the natural fit here, the same way the teacher's
//! in-process caches use interior mutability instead of locking.

pub mod buffer;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{DasError, Result};
use crate::shape::DimLen;
use crate::units::UnitId;
use crate::value::ValueType;

use buffer::{ElementBuffer, IndexInfo, IndexInfoBuffer};

/// Per-array behavioural flags (spec §3 "Array" usage flags). Stored as a
/// small bitset rather than pulling in a flags crate the teacher doesn't
/// already depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayFlags(u8);

impl ArrayFlags {
    pub const PLAIN: ArrayFlags = ArrayFlags(0);
    pub const SUBSEQUENCE: ArrayFlags = ArrayFlags(1 << 0);
    pub const FILL_TERMINATED: ArrayFlags = ArrayFlags(1 << 1);
    pub const UTF8_STRING: ArrayFlags = ArrayFlags(1 << 2);

    pub fn contains(self, other: ArrayFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: ArrayFlags) -> ArrayFlags {
        ArrayFlags(self.0 | other.0)
    }
}

/// A window into dimension 0 of the shared buffers: `(base, count)`. `None`
/// means "the whole current buffer, tracked live" — only true for an owning
/// (root) array. `Some` is a fixed, non-growing view used by subsets.
type Window = Option<(usize, usize)>;

pub struct Array {
    vt: ValueType,
    units: UnitId,
    rank: u8,
    /// Shape hint for dims `1..rank`; `shape_hints[d - 1]` is dim `d`'s hint
    /// (0 = ragged, N>0 = declared qube length). Length `rank - 1`.
    shape_hints: Vec<u32>,
    flags: ArrayFlags,
    owns: bool,
    element: Rc<RefCell<ElementBuffer>>,
    /// Length `rank - 1`; `levels[0]` is addressed directly by dim-0 index,
    /// `levels[d]`'s entries are reached via `levels[d - 1]`'s offsets.
    levels: Vec<Rc<RefCell<IndexInfoBuffer>>>,
    forces_new: RefCell<Vec<bool>>,
    window: Window,
    refcount: Rc<Cell<u32>>,
}

const DEFAULT_CHUNK: usize = 64;

impl Array {
    /// Construct a new owning (root) array of the given rank and per-level
    /// shape hints (`shape_hints.len()` must be `rank - 1`; empty for
    /// rank 1).
    pub fn new(vt: ValueType, units: UnitId, rank: u8, shape_hints: Vec<u32>, flags: ArrayFlags) -> Result<Self> {
        if rank == 0 || rank > 8 {
            return Err(DasError::InvalidArgument(format!("array rank {rank} out of range 1..=8")));
        }
        if shape_hints.len() != rank as usize - 1 {
            return Err(DasError::InvalidArgument("shape_hints length must be rank - 1".into()));
        }
        let levels = (0..rank as usize - 1)
            .map(|_| Rc::new(RefCell::new(IndexInfoBuffer::new(DEFAULT_CHUNK))))
            .collect::<Vec<_>>();
        Ok(Array {
            vt,
            units,
            rank,
            element: Rc::new(RefCell::new(ElementBuffer::new(vt.byte_size(), DEFAULT_CHUNK))),
            forces_new: RefCell::new(vec![false; levels.len()]),
            levels,
            shape_hints,
            flags,
            owns: true,
            window: None,
            refcount: Rc::new(Cell::new(1)),
        })
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn value_type(&self) -> ValueType {
        self.vt
    }

    pub fn units(&self) -> UnitId {
        self.units
    }

    pub fn flags(&self) -> ArrayFlags {
        self.flags
    }

    pub fn refcount(&self) -> u32 {
        self.refcount.get()
    }

    pub fn retain(&self) {
        self.refcount.set(self.refcount.get() + 1);
    }

    pub fn release(&self) -> u32 {
        let n = self.refcount.get().saturating_sub(1);
        self.refcount.set(n);
        n
    }

    fn dim0_base(&self) -> usize {
        self.window.map(|(b, _)| b).unwrap_or(0)
    }

    fn dim0_len(&self) -> usize {
        match self.window {
            Some((_, c)) => c,
            None if self.rank == 1 => self.element.borrow().valid(),
            None => self.levels[0].borrow().valid(),
        }
    }

    /// Descend exactly `idx.len()` levels, each step selecting `idx[i]`
    /// within the window reached so far. Returns `(base, count)` of the
    /// window reached; `count` is in elements if `idx.len() == rank - 1`,
    /// otherwise in entries of `levels[idx.len()]`.
    fn descend_exact(&self, idx: &[i64]) -> Result<(usize, usize)> {
        if idx.len() >= self.rank as usize {
            return Err(DasError::InvalidArgument("index has more components than array rank".into()));
        }
        let mut base = self.dim0_base();
        let mut count = self.dim0_len();
        for (level, &ix) in idx.iter().enumerate() {
            if ix < 0 || ix as usize >= count {
                return Err(DasError::NotFound("index out of range".into()));
            }
            let entry = self.levels[level]
                .borrow()
                .get(base + ix as usize)
                .ok_or_else(|| DasError::NotFound("index-info entry missing".into()))?;
            base = entry.offset as usize;
            count = entry.count as usize;
        }
        Ok((base, count))
    }

    /// `length_in` (spec §4.1 `length_in`): the number of sub-items at the
    /// axis selected by `idx` (empty `idx` means dim 0).
    pub fn length_in(&self, idx: &[i64]) -> Result<usize> {
        if idx.is_empty() {
            return Ok(self.dim0_len());
        }
        let (_, count) = self.descend_exact(idx)?;
        Ok(count)
    }

    /// `get_at` (spec §4.1): a pointer to one element (full index) or the
    /// first element of a contiguous run plus its length (partial index).
    pub fn get_at(&self, idx: &[i64]) -> Result<(usize, usize)> {
        if idx.len() > self.rank as usize {
            return Err(DasError::InvalidArgument("index longer than array rank".into()));
        }
        let prefix_len = idx.len().min(self.rank as usize - 1);
        let (mut base, mut count) = self.descend_exact(&idx[..prefix_len])?;
        // For a short partial index, walk the first child at each remaining
        // level until we reach the element buffer.
        let mut level = prefix_len;
        while level < self.rank as usize - 1 {
            let entry = self.levels[level]
                .borrow()
                .get(base)
                .ok_or_else(|| DasError::NotFound("index-info entry missing".into()))?;
            base = entry.offset as usize;
            count = entry.count as usize;
            level += 1;
        }
        if idx.len() == self.rank as usize {
            let last = idx[idx.len() - 1];
            if last < 0 || last as usize >= count {
                return Err(DasError::NotFound("index out of range".into()));
            }
            Ok((base + last as usize, 1))
        } else {
            Ok((base, count))
        }
    }

    /// Borrow the element bytes located by `get_at`.
    pub fn element_at(&self, idx: &[i64]) -> Result<Vec<u8>> {
        let (start, _) = self.get_at(idx)?;
        self.element
            .borrow()
            .get(start)
            .map(|b| b.to_vec())
            .ok_or_else(|| DasError::NotFound("element index out of range".into()))
    }

    /// Read `count` consecutive raw elements starting at flat element
    /// index `start` (as returned by [`Array::get_at`]'s partial-index
    /// form) — the vector overlay's way of pulling a whole component run
    /// at once (spec §4.2.3).
    pub fn read_run(&self, start: usize, count: usize) -> Result<Vec<u8>> {
        let elem_size = self.vt.byte_size();
        let mut out = Vec::with_capacity(count * elem_size);
        let buf = self.element.borrow();
        for i in 0..count {
            let bytes = buf
                .get(start + i)
                .ok_or_else(|| DasError::NotFound("element index out of range".into()))?;
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }

    /// `put_at` (spec §4.1): overwrite an already-valid contiguous run.
    /// Refuses (returns `false`) if the target range isn't already valid.
    pub fn put_at(&self, idx: &[i64], values: &[u8], count: usize) -> Result<bool> {
        if idx.len() != self.rank as usize - 1 {
            return Err(DasError::InvalidArgument("put_at requires a dim-(rank-1) prefix index".into()));
        }
        let (base, existing_count) = self.descend_exact(idx)?;
        if count > existing_count {
            return Ok(false);
        }
        Ok(self.element.borrow_mut().put_at(base, values, count))
    }

    fn require_owned(&self) -> Result<()> {
        if !self.owns {
            return Err(DasError::InvalidArgument("operation requires an owning array".into()));
        }
        Ok(())
    }

    /// `append` (spec §4.1): append `count` elements to the fastest-varying
    /// dimension, cascading new parent entries up through any level that is
    /// either forced (by a prior `mark_end`) or full (non-ragged and at its
    /// declared shape hint).
    pub fn append(&self, values: &[u8], count: usize) -> Result<()> {
        self.require_owned()?;
        if self.rank == 1 {
            self.element.borrow_mut().append(values, count);
            return Ok(());
        }
        let deepest = self.levels.len() - 1;
        let elem_start = self.element.borrow_mut().append(values, count);
        let mut new_index = self.push_or_extend(deepest, elem_start as u32, count as u32)?;
        for level in (0..deepest).rev() {
            match new_index {
                None => break,
                Some(child_idx) => {
                    new_index = self.push_or_extend_parent(level, child_idx as u32)?;
                }
            }
        }
        Ok(())
    }

    /// Push or extend the deepest level (the one directly above the element
    /// buffer), returning `Some(new_entry_index)` if a new entry was
    /// created (which must cascade to the parent), `None` if an existing
    /// entry was merely extended.
    fn push_or_extend(&self, level: usize, offset: u32, count: u32) -> Result<Option<usize>> {
        let mut forces = self.forces_new.borrow_mut();
        let mut buf = self.levels[level].borrow_mut();
        let hint = self.shape_hints[level];
        let must_push = forces[level] || buf.last().is_none();
        if must_push {
            forces[level] = false;
            let idx = buf.push(IndexInfo { offset, count });
            return Ok(Some(idx));
        }
        let last = buf.last_mut().unwrap();
        if hint > 0 && last.count >= hint {
            let idx = buf.push(IndexInfo { offset, count });
            return Ok(Some(idx));
        }
        if hint > 0 && last.count + count > hint {
            return Err(DasError::RangeOverflow(format!(
                "append would exceed declared shape hint {hint} at dim {}",
                level + 1
            )));
        }
        last.count += count;
        Ok(None)
    }

    /// Push or extend an upper level to record that a new child entry was
    /// created at `level + 1`, identified by `child_idx`.
    fn push_or_extend_parent(&self, level: usize, child_idx: u32) -> Result<Option<usize>> {
        let mut forces = self.forces_new.borrow_mut();
        let mut buf = self.levels[level].borrow_mut();
        let hint = self.shape_hints[level];
        let must_push = forces[level] || buf.last().is_none();
        if must_push {
            forces[level] = false;
            let idx = buf.push(IndexInfo { offset: child_idx, count: 1 });
            return Ok(Some(idx));
        }
        let last = buf.last_mut().unwrap();
        if hint > 0 && last.count >= hint {
            let idx = buf.push(IndexInfo { offset: child_idx, count: 1 });
            return Ok(Some(idx));
        }
        last.count += 1;
        Ok(None)
    }

    /// `mark_end(d)` (spec §4.1): force the next append to start new parent
    /// entries at depth `d` and every depth below it (towards the element
    /// buffer). Invalid at depth 0.
    pub fn mark_end(&self, d: usize) -> Result<()> {
        self.require_owned()?;
        if d == 0 {
            return Err(DasError::InvalidArgument("mark_end is invalid at depth 0".into()));
        }
        if d >= self.rank as usize {
            return Err(DasError::InvalidArgument("mark_end depth exceeds array rank".into()));
        }
        let mut forces = self.forces_new.borrow_mut();
        for level in (d - 1)..self.levels.len() {
            forces[level] = true;
        }
        Ok(())
    }

    /// `qube_in(d)` (spec §4.1): pad the last subtree at depth `d` (and
    /// every depth below it) with fill out to the declared shape hint.
    /// Fails if any padded dimension is ragged.
    pub fn qube_in(&self, d: usize) -> Result<()> {
        self.require_owned()?;
        if d == 0 || d >= self.rank as usize {
            return Err(DasError::InvalidArgument("qube_in depth must be in 1..rank".into()));
        }
        self.qube_level(d - 1)
    }

    fn qube_level(&self, level: usize) -> Result<()> {
        let hint = self.shape_hints[level];
        if hint == 0 {
            return Err(DasError::RangeOverflow("cannot qube a ragged dimension".into()));
        }
        if level == self.levels.len() - 1 {
            let current = self.levels[level].borrow().last().map(|e| e.count).unwrap_or(0);
            if current < hint {
                let pad_n = (hint - current) as usize;
                let fill = self.vt.fill_bytes();
                self.element.borrow_mut().pad_fill(pad_n, &fill);
                let mut buf = self.levels[level].borrow_mut();
                match buf.last_mut() {
                    Some(last) => last.count = hint,
                    None => {
                        let start =
                            self.element.borrow().valid() - pad_n;
                        buf.push(IndexInfo { offset: start as u32, count: hint });
                    }
                }
            }
            return Ok(());
        }
        self.qube_level(level + 1)?;
        let current = self.levels[level].borrow().last().map(|e| e.count).unwrap_or(0);
        if current < hint {
            let pad_n = hint - current;
            for _ in 0..pad_n {
                let child_idx = self.push_filled_subentry(level + 1)?;
                let mut buf = self.levels[level].borrow_mut();
                match buf.last_mut() {
                    Some(last) => last.count += 1,
                    None => {
                        buf.push(IndexInfo { offset: child_idx as u32, count: 1 });
                    }
                }
            }
        }
        Ok(())
    }

    /// Build a brand-new, fully fill-padded subtree rooted at `level` and
    /// return its index within `levels[level]`.
    fn push_filled_subentry(&self, level: usize) -> Result<usize> {
        let hint = self.shape_hints[level];
        if hint == 0 {
            return Err(DasError::RangeOverflow("cannot qube a ragged dimension".into()));
        }
        if level == self.levels.len() - 1 {
            let fill = self.vt.fill_bytes();
            let start = self.element.borrow_mut().pad_fill(hint as usize, &fill);
            Ok(self.levels[level].borrow_mut().push(IndexInfo { offset: start as u32, count: hint }))
        } else {
            let mut first_child = None;
            for _ in 0..hint {
                let child_idx = self.push_filled_subentry(level + 1)?;
                if first_child.is_none() {
                    first_child = Some(child_idx);
                }
            }
            Ok(self.levels[level]
                .borrow_mut()
                .push(IndexInfo { offset: first_child.unwrap() as u32, count: hint }))
        }
    }

    /// `clear` (spec §4.1): drop all data, retaining allocated capacity.
    pub fn clear(&self) -> Result<()> {
        self.require_owned()?;
        self.element.borrow_mut().clear();
        for level in &self.levels {
            level.borrow_mut().clear();
        }
        for f in self.forces_new.borrow_mut().iter_mut() {
            *f = false;
        }
        Ok(())
    }

    /// `disown_elements` (spec §4.1): detach this array from its buffers so
    /// dropping it doesn't affect any subset views still holding `Rc`
    /// clones — used when an owning array is being replaced but its
    /// existing subsets must keep reading the old data.
    pub fn disown_elements(self) -> DisownedArray {
        DisownedArray {
            element: self.element,
            levels: self.levels,
        }
    }

    /// `subset(start_idx, partial_rank)` (spec §4.1): a non-owning view
    /// sharing buffers, with external rank reduced by `partial_rank`.
    pub fn subset(&self, start_idx: &[i64], partial_rank: usize) -> Result<Array> {
        if partial_rank == 0 || partial_rank >= self.rank as usize {
            return Err(DasError::InvalidArgument("partial_rank must be in 1..rank".into()));
        }
        if start_idx.len() != partial_rank {
            return Err(DasError::InvalidArgument("start_idx length must equal partial_rank".into()));
        }
        let (base, count) = self.descend_exact(start_idx)?;
        let new_rank = self.rank - partial_rank as u8;
        let new_levels = self.levels[partial_rank..].to_vec();
        let new_hints = self.shape_hints[partial_rank..].to_vec();
        Ok(Array {
            vt: self.vt,
            units: self.units,
            rank: new_rank,
            shape_hints: new_hints,
            flags: self.flags,
            owns: false,
            element: self.element.clone(),
            forces_new: RefCell::new(vec![false; new_levels.len()]),
            levels: new_levels,
            window: Some((base, count)),
            refcount: Rc::new(Cell::new(1)),
        })
    }

    /// `shape(out)` (spec §4.1): `DIM(0)` is the current count, `DIM(d>0)`
    /// is the declared hint or `RAGGED`.
    pub fn shape(&self) -> Vec<DimLen> {
        let mut out = Vec::with_capacity(self.rank as usize);
        out.push(DimLen::Finite(self.dim0_len() as u32));
        for &hint in &self.shape_hints {
            out.push(if hint == 0 { DimLen::Ragged } else { DimLen::Finite(hint) });
        }
        out
    }

    /// `stride(out_shape, out_stride)` (spec §4.1): valid only when every
    /// dimension is declared uniform; otherwise cascades `RAGGED` from the
    /// innermost ragged dimension outward to dim 0 (SPEC_FULL §15 decision).
    pub fn stride(&self) -> Vec<DimLen> {
        let rank = self.rank as usize;
        let mut out = vec![DimLen::Finite(0); rank];
        let ragged_level = self.shape_hints.iter().position(|&h| h == 0);
        match ragged_level {
            None => {
                let mut acc: u32 = 1;
                for d in (1..rank).rev() {
                    out[d] = DimLen::Finite(acc);
                    acc = acc.saturating_mul(self.shape_hints[d - 1]);
                }
                out[0] = DimLen::Finite(acc);
            }
            Some(first_ragged_level) => {
                let ragged_dim = first_ragged_level + 1;
                let mut acc: u32 = 1;
                for d in (ragged_dim + 1..rank).rev() {
                    out[d] = DimLen::Finite(acc);
                    acc = acc.saturating_mul(self.shape_hints[d - 1]);
                }
                for item in out.iter_mut().take(ragged_dim + 1) {
                    *item = DimLen::Ragged;
                }
            }
        }
        out
    }
}

/// Buffers detached from an array whose handle has otherwise been dropped;
/// kept alive only via `Rc` clones held by existing subset views.
pub struct DisownedArray {
    #[allow(dead_code)]
    element: Rc<RefCell<ElementBuffer>>,
    #[allow(dead_code)]
    levels: Vec<Rc<RefCell<IndexInfoBuffer>>>,
}
