//! The page-file abstraction the B+Tree is built against.
//!
//! The index never touches `std::fs::File` directly; it depends on the
//! [`PageFile`] trait so the storage backend can be swapped (an in-memory
//! file for tests, a real one on disk) without the node or index layers
//! knowing the difference.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::IndexResult;

/// The mode a page file is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only; writes are rejected by the backing implementation.
    Read,
    /// Read-write; creates the file if it does not exist.
    Write,
}

/// Fixed-page-size block storage: read/write whole pages by id, and append
/// new pages at the end. Page 0 is reserved for index metadata by convention
/// of the caller, not enforced here.
pub trait PageFile {
    /// Read the page `pid` into `buf`. `buf.len()` is always the page size.
    fn read(&mut self, pid: i32, buf: &mut [u8]) -> IndexResult<()>;

    /// Write `buf` to page `pid`, extending the file if `pid == end_pid()`.
    fn write(&mut self, pid: i32, buf: &[u8]) -> IndexResult<()>;

    /// One past the last allocated page id (0 for a brand-new file).
    fn end_pid(&self) -> i32;

    /// The fixed page size this file was opened with.
    fn page_size(&self) -> usize;

    /// Flush and release the backing resource.
    fn close(self) -> IndexResult<()>;
}

/// A [`PageFile`] backed by a single `std::fs::File` on the local filesystem.
///
/// This is the only concrete storage backend this crate ships. The index
/// is an embedded library, not a client of a remote block service.
pub struct FilePageFile {
    file: File,
    page_size: usize,
    mode: OpenMode,
    end_pid: i32,
}

impl FilePageFile {
    /// Open (creating if necessary under [`OpenMode::Write`]) the page file at `path`.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, page_size: usize) -> IndexResult<Self> {
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(path)?,
            OpenMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?,
        };
        let len = file.metadata()?.len();
        let end_pid = (len / page_size as u64) as i32;
        Ok(FilePageFile {
            file,
            page_size,
            mode,
            end_pid,
        })
    }
}

impl PageFile for FilePageFile {
    fn read(&mut self, pid: i32, buf: &mut [u8]) -> IndexResult<()> {
        let offset = (pid as u64) * (self.page_size as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, pid: i32, buf: &[u8]) -> IndexResult<()> {
        if self.mode == OpenMode::Read {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "page file opened read-only",
            )
            .into());
        }
        let offset = (pid as u64) * (self.page_size as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        if pid >= self.end_pid {
            self.end_pid = pid + 1;
        }
        Ok(())
    }

    fn end_pid(&self) -> i32 {
        self.end_pid
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn close(self) -> IndexResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_file_has_no_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let pf = FilePageFile::open(&path, OpenMode::Write, 1024).unwrap();
        assert_eq!(pf.end_pid(), 0);
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut pf = FilePageFile::open(&path, OpenMode::Write, 1024).unwrap();

        let mut page = [0u8; 1024];
        page[0] = 0xAB;
        pf.write(0, &page).unwrap();
        assert_eq!(pf.end_pid(), 1);

        let mut out = [0u8; 1024];
        pf.read(0, &mut out).unwrap();
        assert_eq!(out[0], 0xAB);
    }

    #[test]
    fn test_append_at_end_pid_grows_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        let mut pf = FilePageFile::open(&path, OpenMode::Write, 1024).unwrap();

        let page = [0u8; 1024];
        pf.write(pf.end_pid(), &page).unwrap();
        pf.write(pf.end_pid(), &page).unwrap();
        assert_eq!(pf.end_pid(), 2);
    }

    #[test]
    fn test_reopening_preserves_end_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.idx");
        {
            let mut pf = FilePageFile::open(&path, OpenMode::Write, 1024).unwrap();
            let page = [0u8; 1024];
            pf.write(0, &page).unwrap();
            pf.write(1, &page).unwrap();
            pf.close().unwrap();
        }
        let pf = FilePageFile::open(&path, OpenMode::Read, 1024).unwrap();
        assert_eq!(pf.end_pid(), 2);
    }
}
