//! Internal (non-leaf) nodes: pure routing, no user data.

use crate::error::{IndexError, IndexResult};
use crate::page::{self, read_i32, write_i32, INTERNAL_ENTRY_SIZE, PID_SIZE};
use crate::page_file::PageFile;

/// An internal page: a leftmost child pointer followed by a sorted run of
/// `(key, child pid)` entries.
#[derive(Clone)]
pub struct InternalNode {
    buf: Vec<u8>,
    page_size: usize,
}

impl InternalNode {
    /// A freshly zeroed internal node for the given page size.
    pub fn new(page_size: usize) -> Self {
        InternalNode {
            buf: vec![0u8; page_size],
            page_size,
        }
    }

    /// Maximum number of entries this node can hold.
    pub fn capacity(&self) -> usize {
        page::capacity(self.page_size)
    }

    /// Read the internal node at `pid` from `pf`.
    pub fn read(pf: &mut impl PageFile, pid: i32) -> IndexResult<Self> {
        let page_size = pf.page_size();
        let mut buf = vec![0u8; page_size];
        pf.read(pid, &mut buf)?;
        Ok(InternalNode { buf, page_size })
    }

    /// Write this node to `pid` in `pf`.
    pub fn write(&self, pf: &mut impl PageFile, pid: i32) -> IndexResult<()> {
        pf.write(pid, &self.buf)
    }

    fn entry_offset(&self, eid: usize) -> usize {
        PID_SIZE + eid * INTERNAL_ENTRY_SIZE
    }

    fn entry_key(&self, eid: usize) -> i32 {
        read_i32(&self.buf, self.entry_offset(eid))
    }

    fn entry_child(&self, eid: usize) -> i32 {
        read_i32(&self.buf, self.entry_offset(eid) + 4)
    }

    fn set_entry(&mut self, eid: usize, key: i32, child: i32) {
        let off = self.entry_offset(eid);
        write_i32(&mut self.buf, off, key);
        write_i32(&mut self.buf, off + 4, child);
    }

    fn clear_entry(&mut self, eid: usize) {
        let off = self.entry_offset(eid);
        self.buf[off..off + INTERNAL_ENTRY_SIZE].fill(0);
    }

    /// The leftmost child pointer (taken when a search key precedes every entry).
    pub fn leftmost_child(&self) -> i32 {
        read_i32(&self.buf, 0)
    }

    pub fn set_leftmost_child(&mut self, pid: i32) {
        write_i32(&mut self.buf, 0, pid);
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

    /// Build a fresh root with one key and two children: `pid1` for keys
    /// `< key`, `pid2` for keys `>= key`.
    pub fn initialize_root(&mut self, pid1: i32, key: i32, pid2: i32) {
        self.buf.fill(0);
        self.set_leftmost_child(pid1);
        self.set_entry(0, key, pid2);
    }

    /// Pick the child to descend into for `search_key`.
    pub fn locate_child_ptr(&self, search_key: i32) -> i32 {
        let count = self.key_count();
        if count == 0 || search_key < self.entry_key(0) {
            return self.leftmost_child();
        }
        let mut child = self.leftmost_child();
        for i in 0..count {
            if self.entry_key(i) <= search_key {
                child = self.entry_child(i);
            } else {
                break;
            }
        }
        child
    }

    /// Insert `(key, pid)` in sorted position. Fails if the node is full.
    pub fn insert(&mut self, key: i32, pid: i32) -> IndexResult<()> {
        let count = self.key_count();
        if count == self.capacity() {
            return Err(IndexError::NodeFull);
        }
        let mut i = count;
        for j in 0..count {
            if self.entry_key(j) > key {
                i = j;
                break;
            }
        }
        for j in (i..count).rev() {
            let k = self.entry_key(j);
            let c = self.entry_child(j);
            self.set_entry(j + 1, k, c);
        }
        self.set_entry(i, key, pid);
        Ok(())
    }

    /// Insert `(key, pid)` and split the overflow into `sibling`, which must
    /// be empty and this node must be full. Returns the promoted key, which
    /// is removed from both halves (unlike a leaf split).
    pub fn insert_and_split(
        &mut self,
        key: i32,
        pid: i32,
        sibling: &mut InternalNode,
    ) -> IndexResult<i32> {
        debug_assert_eq!(sibling.key_count(), 0, "split sibling must be empty");
        let n = self.key_count();
        debug_assert_eq!(n, self.capacity(), "insert_and_split requires a full node");

        let mut s = (n - 1) / 2;
        if key > self.entry_key(s + 1) {
            s += 1;
        }
        let pivot = self.entry_key(s);

        sibling.set_leftmost_child(self.entry_child(s));
        sibling.set_entry(0, self.entry_key(s + 1), self.entry_child(s + 1));
        let mut j = 1;
        for i in (s + 2)..n {
            sibling.set_entry(j, self.entry_key(i), self.entry_child(i));
            j += 1;
        }
        for i in s..n {
            self.clear_entry(i);
        }

        if key < pivot {
            self.insert(key, pid)?;
        } else {
            sibling.insert(key, pid)?;
        }

        Ok(pivot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap3_node() -> InternalNode {
        // capacity = (page_size - 4) / 8 = 3
        InternalNode::new(4 + 8 * 3)
    }

    fn cap5_node() -> InternalNode {
        // capacity = (page_size - 4) / 8 = 5; the split arithmetic in
        // insert_and_split needs entries[s+1] to exist both before and
        // after the conditional increment, which requires capacity >= 4.
        InternalNode::new(4 + 8 * 5)
    }

    #[test]
    fn test_initialize_root_has_one_key_two_children() {
        let mut node = cap3_node();
        node.initialize_root(1, 50, 2);
        assert_eq!(node.key_count(), 1);
        assert_eq!(node.leftmost_child(), 1);
        assert_eq!(node.locate_child_ptr(10), 1);
        assert_eq!(node.locate_child_ptr(50), 2);
        assert_eq!(node.locate_child_ptr(999), 2);
    }

    #[test]
    fn test_locate_child_ptr_routes_between_entries() {
        let mut node = cap3_node();
        node.initialize_root(1, 10, 2);
        node.insert(20, 3).unwrap();
        node.insert(30, 4).unwrap();
        assert_eq!(node.locate_child_ptr(5), 1);
        assert_eq!(node.locate_child_ptr(10), 2);
        assert_eq!(node.locate_child_ptr(15), 2);
        assert_eq!(node.locate_child_ptr(20), 3);
        assert_eq!(node.locate_child_ptr(25), 3);
        assert_eq!(node.locate_child_ptr(30), 4);
        assert_eq!(node.locate_child_ptr(1000), 4);
    }

    #[test]
    fn test_insert_on_full_node_fails() {
        let mut node = cap3_node();
        node.initialize_root(1, 10, 2);
        node.insert(20, 3).unwrap();
        node.insert(30, 4).unwrap();
        assert!(matches!(node.insert(40, 5), Err(IndexError::NodeFull)));
    }

    fn full_cap5(node: &mut InternalNode) {
        node.initialize_root(1, 10, 2);
        node.insert(20, 3).unwrap();
        node.insert(30, 4).unwrap();
        node.insert(40, 5).unwrap();
        node.insert(50, 6).unwrap();
    }

    #[test]
    fn test_split_promotes_mid_key_without_storing_it() {
        let mut node = cap5_node();
        full_cap5(&mut node);

        let mut sibling = cap5_node();
        // s = (5-1)/2 = 2; entries[3].key = 40; 25 <= 40 so s stays 2. pivot = entries[2].key = 30.
        let promoted = node.insert_and_split(25, 99, &mut sibling).unwrap();

        assert_eq!(promoted, 30);
        assert_eq!(node.key_count(), 3);
        assert_eq!(sibling.key_count(), 2);
        assert_eq!(sibling.leftmost_child(), 4);

        for i in 0..node.key_count() {
            assert_ne!(node.entry_key(i), promoted);
        }
        for i in 0..sibling.key_count() {
            assert_ne!(sibling.entry_key(i), promoted);
        }
    }

    #[test]
    fn test_split_places_new_entry_in_correct_half() {
        let mut node = cap5_node();
        full_cap5(&mut node);

        let mut sibling = cap5_node();
        // key 45 > entries[3].key (40), so s increments to 3, pivot = entries[3].key = 40.
        let promoted = node.insert_and_split(45, 99, &mut sibling).unwrap();
        assert_eq!(promoted, 40);
        assert_eq!(node.key_count(), 3);
        assert_eq!(sibling.key_count(), 2);
        assert_eq!(sibling.leftmost_child(), 5);
        assert_eq!(sibling.locate_child_ptr(45), 99);
    }
}
