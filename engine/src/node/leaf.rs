//! Leaf nodes: the only place user data lives.

use crate::error::{IndexError, IndexResult};
use crate::page::{
    self, read_i16, read_i32, write_i16, write_i32, LEAF_ENTRY_SIZE, NO_PID,
};
use crate::page_file::PageFile;
use crate::record::RecordLocator;

/// A leaf page: a sorted run of `(key, record locator)` entries followed by
/// a trailing forward-sibling pid. Owns a page-sized byte buffer; the
/// buffer is not shared with any other in-flight operation.
#[derive(Clone)]
pub struct LeafNode {
    buf: Vec<u8>,
    page_size: usize,
}

impl LeafNode {
    /// A freshly zeroed leaf for the given page size.
    pub fn new(page_size: usize) -> Self {
        let mut node = LeafNode {
            buf: vec![0u8; page_size],
            page_size,
        };
        node.set_next_sibling_unchecked(NO_PID);
        node
    }

    /// Maximum number of entries this leaf can hold.
    pub fn capacity(&self) -> usize {
        page::capacity(self.page_size)
    }

    /// Read the leaf at `pid` from `pf`.
    pub fn read(pf: &mut impl PageFile, pid: i32) -> IndexResult<Self> {
        let page_size = pf.page_size();
        let mut buf = vec![0u8; page_size];
        pf.read(pid, &mut buf)?;
        Ok(LeafNode { buf, page_size })
    }

    /// Write this leaf to `pid` in `pf`.
    pub fn write(&self, pf: &mut impl PageFile, pid: i32) -> IndexResult<()> {
        pf.write(pid, &self.buf)
    }

    fn entry_offset(&self, eid: usize) -> usize {
        eid * LEAF_ENTRY_SIZE
    }

    fn next_sibling_offset(&self) -> usize {
        self.capacity() * LEAF_ENTRY_SIZE
    }

    fn entry_key(&self, eid: usize) -> i32 {
        read_i32(&self.buf, self.entry_offset(eid))
    }

    fn entry_locator(&self, eid: usize) -> RecordLocator {
        let off = self.entry_offset(eid);
        RecordLocator::new(read_i16(&self.buf, off + 4), read_i16(&self.buf, off + 6))
    }

    fn set_entry(&mut self, eid: usize, key: i32, rid: RecordLocator) {
        let off = self.entry_offset(eid);
        write_i32(&mut self.buf, off, key);
        write_i16(&mut self.buf, off + 4, rid.page);
        write_i16(&mut self.buf, off + 6, rid.slot);
    }

    fn clear_entry(&mut self, eid: usize) {
        let off = self.entry_offset(eid);
        self.buf[off..off + LEAF_ENTRY_SIZE].fill(0);
    }

    fn set_next_sibling_unchecked(&mut self, pid: i32) {
        let off = self.next_sibling_offset();
        write_i32(&mut self.buf, off, pid);
    }

    /// Number of occupied entries: the first zero-key slot, or capacity.
    pub fn key_count(&self) -> usize {
        let capacity = self.capacity();
        for i in 0..capacity {
            if self.entry_key(i) == 0 {
                return i;
            }
        }
        capacity
    }

    /// Find `search_key`. Returns `(true, i)` on exact match at index `i`,
    /// else `(false, i)` where `i` is the smallest index whose key exceeds
    /// `search_key` (or `key_count()` if none does).
    pub fn locate(&self, search_key: i32) -> (bool, usize) {
        let count = self.key_count();
        for i in 0..count {
            let k = self.entry_key(i);
            if k == search_key {
                return (true, i);
            }
            if k > search_key {
                return (false, i);
            }
        }
        (false, count)
    }

    /// Insert `(key, rid)` in sorted position. Fails if the leaf is full.
    pub fn insert(&mut self, key: i32, rid: RecordLocator) -> IndexResult<()> {
        let count = self.key_count();
        if count == self.capacity() {
            return Err(IndexError::NodeFull);
        }
        let (_, i) = self.locate(key);
        for j in (i..count).rev() {
            let k = self.entry_key(j);
            let r = self.entry_locator(j);
            self.set_entry(j + 1, k, r);
        }
        self.set_entry(i, key, rid);
        Ok(())
    }

    /// Insert `(key, rid)` and split the overflow into `sibling`, which must
    /// be empty. Returns the first key of the resulting right half.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        rid: RecordLocator,
        sibling: &mut LeafNode,
    ) -> IndexResult<i32> {
        debug_assert_eq!(sibling.key_count(), 0, "split sibling must be empty");
        let n = self.key_count();
        let split = n.div_ceil(2);
        let (_, i) = self.locate(key);

        let sibling_first_key = if i == split {
            key
        } else {
            self.entry_key(split)
        };

        for j in split..n {
            let k = self.entry_key(j);
            let r = self.entry_locator(j);
            sibling.set_entry(j - split, k, r);
            self.clear_entry(j);
        }

        if i < split {
            self.insert(key, rid)?;
        } else {
            sibling.insert(key, rid)?;
        }

        Ok(sibling_first_key)
    }

    /// Bounds-checked read of entry `eid`.
    pub fn read_entry(&self, eid: usize) -> IndexResult<(i32, RecordLocator)> {
        page::check_eid(eid, self.key_count())?;
        Ok((self.entry_key(eid), self.entry_locator(eid)))
    }

    /// The forward sibling pid, or [`NO_PID`] when this is the last leaf.
    pub fn next_sibling(&self) -> i32 {
        read_i32(&self.buf, self.next_sibling_offset())
    }

    /// Set the forward sibling pid. Rejects negative pids other than [`NO_PID`].
    pub fn set_next_sibling(&mut self, pid: i32) -> IndexResult<()> {
        if pid < 0 && pid != NO_PID {
            return Err(IndexError::InvalidPid(pid));
        }
        self.set_next_sibling_unchecked(pid);
        Ok(())
    }
}
