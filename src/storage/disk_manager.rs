//! Disk Manager - page-granular file I/O for one index file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Reads, writes and allocates pages in a single file.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────┬──────────┬─────┬──────────┐
/// │ Page 0   │ Page 1   │ Page 2   │ ... │ Page N   │
/// │ metadata │ node     │ node     │     │ node     │
/// └──────────┴──────────┴──────────┴─────┴──────────┘
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`.
///
/// # Durability
/// Writes go to the OS page cache; [`DiskManager::sync`] forces them to
/// stable storage. The buffer pool calls it at the end of a full flush.
pub struct DiskManager {
    file: File,
    page_count: u32,
}

impl DiskManager {
    /// Create a new, empty file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
        })
    }

    /// Open an existing file. A trailing partial page is ignored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self { file, page_count })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page was never allocated.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_bounds(page_id)?;

        self.file.seek(SeekFrom::Start(Self::offset_of(page_id)))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a previously allocated page.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_bounds(page_id)?;

        self.file.seek(SeekFrom::Start(Self::offset_of(page_id)))?;
        self.file.write_all(page.as_slice())?;

        Ok(())
    }

    /// Extend the file by one zeroed page and return its id.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.page_count);
        self.file
            .set_len(Self::offset_of(page_id) + PAGE_SIZE as u64)?;
        self.page_count += 1;
        Ok(page_id)
    }

    /// Flush file contents and metadata to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    fn offset_of(page_id: PageId) -> u64 {
        page_id.as_u32() as u64 * PAGE_SIZE as u64
    }

    fn check_bounds(&self, page_id: PageId) -> Result<()> {
        if page_id.as_u32() >= self.page_count {
            return Err(Error::PageNotFound(page_id.as_u32()));
        }
        Ok(())
    }
}
