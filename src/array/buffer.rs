//! Element and index-info buffers underlying [`super::Array`].
//!
//! Growth strategy (spec §4.1 "Growth strategy"): if a request exceeds
//! capacity, allocate `max(current_valid * 2, 64, requested)` rounded up to
//! the buffer's chunk size. Grounded on the teacher's `WriteBuffer`
//! (`storage_v2/write_buffer.rs`) for the "accumulate, don't resize per
//! element" posture, generalized here to an explicit doubling allocator
//! since the teacher's `HashMap`-backed buffer left growth to `std`.

/// One `(offset, count)` pair: `offset` indexes into the next-lower buffer,
/// `count` is the number of contiguous elements owned by this parent cell
/// (spec §3 "Array" storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexInfo {
    pub offset: u32,
    pub count: u32,
}

fn grow_capacity(current_valid: usize, requested_extra: usize, chunk: usize) -> usize {
    let needed = current_valid + requested_extra;
    let doubled = (current_valid * 2).max(64).max(needed);
    let chunk = chunk.max(1);
    doubled.div_ceil(chunk) * chunk
}

/// A flat, growable buffer of fixed-width elements (raw bytes). Used for
/// the fastest-varying dimension's element storage.
#[derive(Debug, Clone)]
pub struct ElementBuffer {
    pub elem_size: usize,
    data: Vec<u8>,
    valid: usize, // element count, not bytes
    chunk_elems: usize,
}

impl ElementBuffer {
    pub fn new(elem_size: usize, chunk_elems: usize) -> Self {
        ElementBuffer { elem_size, data: Vec::new(), valid: 0, chunk_elems: chunk_elems.max(1) }
    }

    pub fn valid(&self) -> usize {
        self.valid
    }

    pub fn capacity_elems(&self) -> usize {
        if self.elem_size == 0 {
            0
        } else {
            self.data.len() / self.elem_size
        }
    }

    fn ensure_capacity(&mut self, extra_elems: usize) {
        let cap = self.capacity_elems();
        if self.valid + extra_elems <= cap {
            return;
        }
        let new_cap = grow_capacity(self.valid, extra_elems, self.chunk_elems);
        self.data.resize(new_cap * self.elem_size, 0);
    }

    /// Append `count` elements from `values` (exactly `count * elem_size`
    /// bytes). Returns the element index of the first appended element.
    pub fn append(&mut self, values: &[u8], count: usize) -> usize {
        debug_assert_eq!(values.len(), count * self.elem_size);
        self.ensure_capacity(count);
        let start_byte = self.valid * self.elem_size;
        self.data[start_byte..start_byte + values.len()].copy_from_slice(values);
        let start_elem = self.valid;
        self.valid += count;
        start_elem
    }

    pub fn get(&self, elem_idx: usize) -> Option<&[u8]> {
        if elem_idx >= self.valid {
            return None;
        }
        let start = elem_idx * self.elem_size;
        Some(&self.data[start..start + self.elem_size])
    }

    pub fn put_at(&mut self, elem_idx: usize, values: &[u8], count: usize) -> bool {
        if elem_idx + count > self.valid {
            return false;
        }
        let start = elem_idx * self.elem_size;
        self.data[start..start + values.len()].copy_from_slice(values);
        true
    }

    pub fn pad_fill(&mut self, count: usize, fill: &[u8]) -> usize {
        self.ensure_capacity(count);
        let start_elem = self.valid;
        for i in 0..count {
            let start = (start_elem + i) * self.elem_size;
            self.data[start..start + self.elem_size].copy_from_slice(fill);
        }
        self.valid += count;
        start_elem
    }

    pub fn clear(&mut self) {
        self.valid = 0;
    }
}

/// A flat, growable buffer of `(offset, count)` pairs for one upper
/// dimension.
#[derive(Debug, Clone, Default)]
pub struct IndexInfoBuffer {
    entries: Vec<IndexInfo>,
    chunk: usize,
}

impl IndexInfoBuffer {
    pub fn new(chunk: usize) -> Self {
        IndexInfoBuffer { entries: Vec::new(), chunk: chunk.max(1) }
    }

    pub fn valid(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, idx: usize) -> Option<IndexInfo> {
        self.entries.get(idx).copied()
    }

    pub fn last_mut(&mut self) -> Option<&mut IndexInfo> {
        self.entries.last_mut()
    }

    pub fn last(&self) -> Option<IndexInfo> {
        self.entries.last().copied()
    }

    /// Push a new parent entry. Growth is implicit via `Vec::push`'s own
    /// amortized doubling; we additionally honour the chunk hint by
    /// reserving ahead when the vector needs to grow, matching the element
    /// buffer's chunk-rounding behaviour.
    pub fn push(&mut self, entry: IndexInfo) -> usize {
        if self.entries.len() == self.entries.capacity() {
            let extra = grow_capacity(self.entries.len(), 1, self.chunk) - self.entries.len();
            self.entries.reserve(extra);
        }
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexInfo> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_buffer_append_and_get() {
        let mut buf = ElementBuffer::new(4, 8);
        let start = buf.append(&1u32.to_le_bytes(), 1);
        assert_eq!(start, 0);
        assert_eq!(buf.valid(), 1);
        assert_eq!(u32::from_le_bytes(buf.get(0).unwrap().try_into().unwrap()), 1);
    }

    #[test]
    fn element_buffer_growth_never_shrinks_valid() {
        let mut buf = ElementBuffer::new(1, 4);
        for i in 0..1000u32 {
            buf.append(&[(i % 256) as u8], 1);
        }
        assert_eq!(buf.valid(), 1000);
    }

    #[test]
    fn put_at_refuses_out_of_range() {
        let mut buf = ElementBuffer::new(1, 4);
        buf.append(&[1], 1);
        assert!(!buf.put_at(5, &[2], 1));
        assert!(buf.put_at(0, &[9], 1));
        assert_eq!(buf.get(0).unwrap(), &[9]);
    }

    #[test]
    fn index_info_push_and_iter() {
        let mut iib = IndexInfoBuffer::new(4);
        iib.push(IndexInfo { offset: 0, count: 3 });
        iib.push(IndexInfo { offset: 3, count: 1 });
        assert_eq!(iib.valid(), 2);
        let collected: Vec<_> = iib.iter().collect();
        assert_eq!(collected[0].count, 3);
        assert_eq!(collected[1].offset, 3);
    }

    #[test]
    fn clear_resets_valid_without_freeing() {
        let mut buf = ElementBuffer::new(4, 8);
        buf.append(&1u32.to_le_bytes(), 1);
        buf.clear();
        assert_eq!(buf.valid(), 0);
        assert!(buf.capacity_elems() > 0);
    }
}
