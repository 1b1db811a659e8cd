//! Shared page-layout constants and the little-endian field accessors the
//! node types are built on.
//!
//! Every on-disk integer is read/written through [`read_i32`]/[`write_i32`]
//! etc. at a computed byte offset, with no raw pointer casts over the page
//! buffer, so the layout stays byte-stable across host architectures.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{IndexError, IndexResult};

/// Page size used when a caller doesn't pick one explicitly.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Size in bytes of a page/child pointer on disk.
pub const PID_SIZE: usize = 4;

/// Size in bytes of a key on disk.
pub const KEY_SIZE: usize = 4;

/// Size in bytes of a packed `RecordLocator` (two `i16` fields).
pub const LOCATOR_SIZE: usize = 4;

/// Size in bytes of a leaf entry: `(key, record locator)`.
pub const LEAF_ENTRY_SIZE: usize = KEY_SIZE + LOCATOR_SIZE;

/// Size in bytes of an internal entry: `(key, child pid)`.
pub const INTERNAL_ENTRY_SIZE: usize = KEY_SIZE + PID_SIZE;

/// Sentinel pid meaning "no sibling" / "no pointer".
pub const NO_PID: i32 = -1;

/// Node capacity for a given page size: `⌊(P − sizeof(pid)) / sizeof(entry)⌋`.
///
/// Both node kinds use this same formula. A leaf's trailing sibling pid and
/// an internal node's leading child pid each consume exactly one pid slot,
/// and both entry kinds are the same size.
pub fn capacity(page_size: usize) -> usize {
    (page_size.saturating_sub(PID_SIZE)) / LEAF_ENTRY_SIZE
}

pub(crate) fn read_i32(buf: &[u8], offset: usize) -> i32 {
    LittleEndian::read_i32(&buf[offset..offset + 4])
}

pub(crate) fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    LittleEndian::write_i32(&mut buf[offset..offset + 4], value);
}

pub(crate) fn read_i16(buf: &[u8], offset: usize) -> i16 {
    LittleEndian::read_i16(&buf[offset..offset + 2])
}

pub(crate) fn write_i16(buf: &mut [u8], offset: usize, value: i16) {
    LittleEndian::write_i16(&mut buf[offset..offset + 2], value);
}

/// Bounds-check an entry index against a node's structural key count.
pub(crate) fn check_eid(eid: usize, key_count: usize) -> IndexResult<()> {
    if eid >= key_count {
        Err(IndexError::InvalidEid(eid))
    } else {
        Ok(())
    }
}
