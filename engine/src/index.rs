//! The B+Tree index: owns the page file, drives the recursive insertion
//! protocol, and answers point lookups and forward scans.
//!
//! Node layout and split arithmetic live in [`crate::node`]; this module is
//! the glue that turns a sequence of node operations into a tree that grows
//! top-down on search and bottom-up on split.

use crate::error::{IndexError, IndexResult};
use crate::node::{InternalNode, LeafNode};
use crate::page::{self, NO_PID};
use crate::page_file::PageFile;
use crate::record::RecordLocator;

/// Page id reserved for index metadata; the first leaf is allocated at 1.
const METADATA_PID: i32 = 0;
const FIRST_LEAF_PID: i32 = 1;

/// A scan position: a leaf page id and an entry index within it.
///
/// Carries no references, just two integers, so it can be stashed by a
/// caller (e.g. a SQL scan operator) between calls without borrowing the
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub pid: i32,
    pub eid: usize,
}

/// The result of [`Index::locate`]: a search either lands on an exact match
/// or on the position where the search key would sort, both carrying a
/// cursor usable for a subsequent forward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateOutcome {
    /// `cursor` points at an entry with `key == search_key`.
    Found(Cursor),
    /// `cursor` points at the least key greater than `search_key` in its
    /// leaf (or at end-of-leaf if none).
    NotFound(Cursor),
}

impl LocateOutcome {
    pub fn cursor(&self) -> Cursor {
        match self {
            LocateOutcome::Found(c) | LocateOutcome::NotFound(c) => *c,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, LocateOutcome::Found(_))
    }
}

/// The per-level outcome of the recursive insert helper: either the
/// insertion was absorbed below, or a split happened and a new
/// (separator key, sibling pid) pair must be installed one level up.
enum InsertOutcome {
    Done,
    Promote { key: i32, pid: i32 },
}

/// A disk-backed B+Tree mapping `i32` keys to [`RecordLocator`]s.
///
/// `Index` owns the backing [`PageFile`] for its entire lifetime; there is
/// no internal synchronization, so the caller must serialize all operations
/// against a given instance (see the crate-level concurrency notes).
pub struct Index<PF: PageFile> {
    pf: PF,
    root_pid: i32,
    tree_height: u32,
    page_size: usize,
}

impl<PF: PageFile> Index<PF> {
    /// Wrap an already-open page file. If it contains pages, page 0 is read
    /// and validated against `pf.page_size()`; an empty file yields an
    /// empty index (`root_pid = -1`, `tree_height = 0`) without touching
    /// disk, matching the "nothing written until the first insert" rule.
    pub fn open(mut pf: PF) -> IndexResult<Self> {
        let page_size = pf.page_size();
        if pf.end_pid() > 0 {
            let mut buf = vec![0u8; page_size];
            pf.read(METADATA_PID, &mut buf)?;
            let root_pid = page::read_i32(&buf, 0);
            let tree_height = page::read_i32(&buf, 4);
            let stored_page_size = page::read_i32(&buf, 8);
            if stored_page_size as usize != page_size {
                return Err(IndexError::FileFormat(format!(
                    "index file was created with page size {stored_page_size}, \
                     but was opened with page size {page_size}"
                )));
            }
            if tree_height < 0 {
                return Err(IndexError::FileFormat(format!(
                    "corrupt metadata page: negative tree height {tree_height}"
                )));
            }
            Ok(Index {
                pf,
                root_pid,
                tree_height: tree_height as u32,
                page_size,
            })
        } else {
            Ok(Index {
                pf,
                root_pid: NO_PID,
                tree_height: 0,
                page_size,
            })
        }
    }

    /// Rewrite the metadata page and release the backing page file.
    pub fn close(mut self) -> IndexResult<()> {
        self.write_metadata()?;
        self.pf.close()
    }

    pub fn tree_height(&self) -> u32 {
        self.tree_height
    }

    pub fn root_pid(&self) -> i32 {
        self.root_pid
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_empty(&self) -> bool {
        self.tree_height == 0
    }

    /// One past the last page id allocated in the backing file.
    pub fn end_pid(&self) -> i32 {
        self.pf.end_pid()
    }

    fn write_metadata(&mut self) -> IndexResult<()> {
        let mut buf = vec![0u8; self.page_size];
        page::write_i32(&mut buf, 0, self.root_pid);
        page::write_i32(&mut buf, 4, self.tree_height as i32);
        page::write_i32(&mut buf, 8, self.page_size as i32);
        self.pf.write(METADATA_PID, &buf)
    }

    /// Seek to the first entry `>= search_key`. Fails with
    /// [`IndexError::NoSuchRecord`] only when the index is empty; a
    /// non-empty index with no match returns `Ok(LocateOutcome::NotFound)`
    /// with a cursor still positioned for a forward scan.
    pub fn locate(&mut self, search_key: i32) -> IndexResult<LocateOutcome> {
        if self.tree_height == 0 {
            return Err(IndexError::NoSuchRecord);
        }
        let mut current_pid = self.root_pid;
        for _ in 1..self.tree_height {
            let node = InternalNode::read(&mut self.pf, current_pid)?;
            current_pid = node.locate_child_ptr(search_key);
        }
        let leaf = LeafNode::read(&mut self.pf, current_pid)?;
        let (found, eid) = leaf.locate(search_key);
        let cursor = Cursor {
            pid: current_pid,
            eid,
        };
        Ok(if found {
            LocateOutcome::Found(cursor)
        } else {
            LocateOutcome::NotFound(cursor)
        })
    }

    /// Read the entry at `cursor` and advance it by one slot within the
    /// same leaf. Does not cross sibling boundaries: callers that want to
    /// keep streaming past the end of a leaf must check
    /// `cursor.eid == key_count` themselves and follow `next_sibling`, or
    /// use [`Index::scan_from`] instead.
    pub fn read_forward(&mut self, cursor: &mut Cursor) -> IndexResult<(i32, RecordLocator)> {
        let leaf = LeafNode::read(&mut self.pf, cursor.pid)?;
        let entry = leaf.read_entry(cursor.eid)?;
        cursor.eid += 1;
        Ok(entry)
    }

    /// The cursor for the very first entry in the tree (leftmost leaf,
    /// index 0), or `None` when the tree is empty.
    fn first_cursor(&mut self) -> IndexResult<Option<Cursor>> {
        if self.tree_height == 0 {
            return Ok(None);
        }
        let mut current_pid = self.root_pid;
        for _ in 1..self.tree_height {
            let node = InternalNode::read(&mut self.pf, current_pid)?;
            current_pid = node.leftmost_child();
        }
        Ok(Some(Cursor {
            pid: current_pid,
            eid: 0,
        }))
    }

    /// An auto-advancing iterator starting at `cursor`, chasing sibling
    /// pointers across leaf boundaries. Unlike [`Index::read_forward`], the
    /// caller never has to check for end-of-leaf themselves.
    pub fn scan_from(&mut self, cursor: Cursor) -> ScanIter<'_, PF> {
        ScanIter {
            index: self,
            cursor: Some(cursor),
        }
    }

    /// A full ascending scan from the leftmost leaf.
    pub fn scan(&mut self) -> IndexResult<ScanIter<'_, PF>> {
        let cursor = self.first_cursor()?;
        Ok(ScanIter {
            index: self,
            cursor,
        })
    }

    /// Insert `(key, rid)`. Key `0` is reserved as the on-disk empty-slot
    /// sentinel and is rejected outright rather than silently corrupting a
    /// node's structural key count.
    pub fn insert(&mut self, key: i32, rid: RecordLocator) -> IndexResult<()> {
        if key == 0 {
            return Err(IndexError::ReservedKey);
        }

        if self.tree_height == 0 {
            let mut leaf = LeafNode::new(self.page_size);
            leaf.insert(key, rid)?;
            leaf.write(&mut self.pf, FIRST_LEAF_PID)?;
            self.root_pid = FIRST_LEAF_PID;
            self.tree_height = 1;
            self.write_metadata()?;
            return Ok(());
        }

        match self.insert_recursive(key, rid, 1, self.root_pid)? {
            InsertOutcome::Done => Ok(()),
            InsertOutcome::Promote {
                key: n_key,
                pid: n_pid,
            } => {
                let new_root_pid = self.pf.end_pid();
                let mut new_root = InternalNode::new(self.page_size);
                new_root.initialize_root(self.root_pid, n_key, n_pid);
                new_root.write(&mut self.pf, new_root_pid)?;
                self.root_pid = new_root_pid;
                self.tree_height += 1;
                self.write_metadata()?;
                tracing::debug!(
                    new_root_pid,
                    tree_height = self.tree_height,
                    "root split, tree height increased"
                );
                Ok(())
            }
        }
    }

    /// The recursive insertion helper. The call stack is the implicit
    /// parent chain: each internal frame recurses into its chosen child
    /// before deciding whether it must absorb a promoted split.
    fn insert_recursive(
        &mut self,
        key: i32,
        rid: RecordLocator,
        current_height: u32,
        current_pid: i32,
    ) -> IndexResult<InsertOutcome> {
        if current_height == self.tree_height {
            return self.insert_into_leaf(key, rid, current_pid);
        }

        let mut node = InternalNode::read(&mut self.pf, current_pid)?;
        let child_pid = node.locate_child_ptr(key);

        match self.insert_recursive(key, rid, current_height + 1, child_pid)? {
            InsertOutcome::Done => Ok(InsertOutcome::Done),
            InsertOutcome::Promote {
                key: g_key,
                pid: g_pid,
            } => match node.insert(g_key, g_pid) {
                Ok(()) => {
                    node.write(&mut self.pf, current_pid)?;
                    Ok(InsertOutcome::Done)
                }
                Err(IndexError::NodeFull) => {
                    let mut sibling = InternalNode::new(self.page_size);
                    let mid_key = node.insert_and_split(g_key, g_pid, &mut sibling)?;
                    let sibling_pid = self.pf.end_pid();
                    sibling.write(&mut self.pf, sibling_pid)?;
                    node.write(&mut self.pf, current_pid)?;
                    tracing::debug!(pid = current_pid, sibling_pid, "internal node split");
                    Ok(InsertOutcome::Promote {
                        key: mid_key,
                        pid: sibling_pid,
                    })
                }
                Err(e) => Err(e),
            },
        }
    }

    fn insert_into_leaf(
        &mut self,
        key: i32,
        rid: RecordLocator,
        leaf_pid: i32,
    ) -> IndexResult<InsertOutcome> {
        let mut leaf = LeafNode::read(&mut self.pf, leaf_pid)?;
        match leaf.insert(key, rid) {
            Ok(()) => {
                leaf.write(&mut self.pf, leaf_pid)?;
                Ok(InsertOutcome::Done)
            }
            Err(IndexError::NodeFull) => {
                let mut sibling = LeafNode::new(self.page_size);
                let sibling_first_key = leaf.insert_and_split(key, rid, &mut sibling)?;
                let sibling_pid = self.pf.end_pid();

                // Preserve the old forward link instead of discarding it:
                // the split leaf's existing successor must stay reachable.
                sibling.set_next_sibling(leaf.next_sibling())?;
                leaf.set_next_sibling(sibling_pid)?;

                sibling.write(&mut self.pf, sibling_pid)?;
                leaf.write(&mut self.pf, leaf_pid)?;
                tracing::debug!(pid = leaf_pid, sibling_pid, "leaf split");
                Ok(InsertOutcome::Promote {
                    key: sibling_first_key,
                    pid: sibling_pid,
                })
            }
            Err(e) => Err(e),
        }
    }
}

/// An auto-advancing forward scan produced by [`Index::scan`] or
/// [`Index::scan_from`]. Chases `next_sibling` pointers across leaf
/// boundaries so callers get a single flat stream of `(key, locator)`
/// pairs in ascending order.
pub struct ScanIter<'a, PF: PageFile> {
    index: &'a mut Index<PF>,
    cursor: Option<Cursor>,
}

impl<'a, PF: PageFile> Iterator for ScanIter<'a, PF> {
    type Item = IndexResult<(i32, RecordLocator)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cursor = self.cursor?;
            let leaf = match LeafNode::read(&mut self.index.pf, cursor.pid) {
                Ok(leaf) => leaf,
                Err(e) => {
                    self.cursor = None;
                    return Some(Err(e));
                }
            };
            let count = leaf.key_count();
            if cursor.eid < count {
                let entry = match leaf.read_entry(cursor.eid) {
                    Ok(entry) => entry,
                    Err(e) => {
                        self.cursor = None;
                        return Some(Err(e));
                    }
                };
                let next_eid = cursor.eid + 1;
                self.cursor = if next_eid < count {
                    Some(Cursor {
                        pid: cursor.pid,
                        eid: next_eid,
                    })
                } else {
                    let next_pid = leaf.next_sibling();
                    (next_pid != NO_PID).then_some(Cursor {
                        pid: next_pid,
                        eid: 0,
                    })
                };
                return Some(Ok(entry));
            }

            let next_pid = leaf.next_sibling();
            if next_pid == NO_PID {
                self.cursor = None;
                return None;
            }
            self.cursor = Some(Cursor {
                pid: next_pid,
                eid: 0,
            });
        }
    }
}
