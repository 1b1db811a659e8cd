//! Shared helpers for the integration test suite.

use bpindex_engine::{FilePageFile, Index, OpenMode};
use tempfile::TempDir;

/// A throwaway index file living in a directory that's removed on drop.
pub struct TestIndex {
    pub dir: TempDir,
    pub path: std::path::PathBuf,
    pub page_size: usize,
}

impl TestIndex {
    pub fn new(page_size: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.idx");
        TestIndex {
            dir,
            path,
            page_size,
        }
    }

    pub fn open_write(&self) -> Index<FilePageFile> {
        let pf = FilePageFile::open(&self.path, OpenMode::Write, self.page_size).unwrap();
        Index::open(pf).unwrap()
    }

    pub fn open_read(&self) -> Index<FilePageFile> {
        let pf = FilePageFile::open(&self.path, OpenMode::Read, self.page_size).unwrap();
        Index::open(pf).unwrap()
    }
}

/// Small capacity (4 entries/node) so splits happen after a handful of
/// inserts instead of the 127 the default 1024-byte page size would need.
pub const SMALL_PAGE_SIZE: usize = 4 + 8 * 4;
