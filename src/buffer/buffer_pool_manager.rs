//! Buffer Pool Manager - the page cache under the index.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting, through guards or explicit pin/unpin
//! - Dirty page write-back on eviction and flush
//! - FIFO eviction of unpinned frames

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Caches the pages of one file in a fixed set of frames.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Pinning
/// A page stays resident while its pin count is non-zero. Guards pin for
/// their lifetime. [`pin_page`](Self::pin_page) and
/// [`unpin_page`](Self::unpin_page) hold a pin across calls without holding
/// a lock, which is how a scan cursor keeps its leaf resident between
/// `scan_next` calls.
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(16, DiskManager::create("rel.0")?);
///
/// let page_id = {
///     let mut guard = bpm.new_page()?;
///     guard.as_mut_slice()[0] = 0xAB;
///     guard.page_id()
/// }; // dirty, unpinned
///
/// let guard = bpm.fetch_page_read(page_id)?;
/// ```
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    /// Unused frames, popped LIFO.
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<FifoReplacer>,
    disk_manager: Mutex<DiskManager>,
    stats: BufferPoolStats,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames over `disk_manager`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        Self {
            frames: (0..pool_size).map(|_| Frame::new()).collect(),
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new((0..pool_size).rev().map(FrameId::new).collect()),
            replacer: Mutex::new(FifoReplacer::new()),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Guarded access
    // ========================================================================

    /// Pin a page and take a shared lock on it.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.pin_resident(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Pin a page and take an exclusive lock on it. The page is marked dirty
    /// when the guard drops.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.pin_resident(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Allocate a zeroed page on disk, load it, and return it write-locked.
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.acquire_frame()?;

        let allocated = self.disk_manager.lock().allocate_page();
        let page_id = match allocated {
            Ok(page_id) => page_id,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_allocated);

        let frame = &self.frames[frame_id.0];
        frame.load(page_id, None);
        self.register(frame_id, page_id);
        trace!(%page_id, %frame_id, "allocated page");

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Explicit pins
    // ========================================================================

    /// Pin a page without locking it. Must be balanced by
    /// [`unpin_page`](Self::unpin_page).
    pub fn pin_page(&self, page_id: PageId) -> Result<()> {
        self.pin_resident(page_id).map(|_| ())
    }

    /// Release one pin on a page, marking it dirty if requested.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the page is not resident or has no pins.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let frame_id = self
            .page_table
            .read()
            .get(&page_id)
            .copied()
            .ok_or(Error::PageNotPinned(page_id.as_u32()))?;

        if !self.frames[frame_id.0].is_pinned() {
            return Err(Error::PageNotPinned(page_id.as_u32()));
        }
        self.unpin_frame(frame_id, is_dirty);
        Ok(())
    }

    /// Pin count of a resident page, or `None` if it is not in the pool.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = self.page_table.read().get(&page_id).copied()?;
        Some(self.frames[frame_id.0].pin_count())
    }

    // ========================================================================
    // Flushing
    // ========================================================================

    /// Write back every dirty page and sync the file.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<(PageId, FrameId)> = self
            .page_table
            .read()
            .iter()
            .map(|(&pid, &fid)| (pid, fid))
            .collect();

        for (page_id, frame_id) in resident {
            self.write_back(frame_id, page_id)?;
        }
        self.disk_manager.lock().sync()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of pages in the underlying file.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    /// Sum of pin counts over all frames.
    pub fn total_pins(&self) -> u32 {
        self.frames.iter().map(Frame::pin_count).sum()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Called by guards on drop and by `unpin_page`.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];
        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    /// Make `page_id` resident and pinned, returning its frame.
    fn pin_resident(&self, page_id: PageId) -> Result<FrameId> {
        let cached = self.page_table.read().get(&page_id).copied();
        if let Some(frame_id) = cached {
            self.frames[frame_id.0].pin();
            self.replacer.lock().set_evictable(frame_id, false);
            BufferPoolStats::bump(&self.stats.cache_hits);
            return Ok(frame_id);
        }

        BufferPoolStats::bump(&self.stats.cache_misses);
        let frame_id = self.acquire_frame()?;

        let loaded = self.disk_manager.lock().read_page(page_id);
        let page = match loaded {
            Ok(page) => page,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_read);

        self.frames[frame_id.0].load(page_id, Some(&page));
        self.register(frame_id, page_id);

        Ok(frame_id)
    }

    /// Publish a freshly loaded frame in the page table, pinned.
    fn register(&self, frame_id: FrameId, page_id: PageId) {
        self.page_table.write().insert(page_id, frame_id);

        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    /// A frame from the free list, or one freed by eviction.
    fn acquire_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;
        BufferPoolStats::bump(&self.stats.evictions);

        let frame = &self.frames[frame_id.0];
        if let Some(old_page_id) = frame.page_id() {
            if let Err(e) = self.write_back(frame_id, old_page_id) {
                // Keep the page resident so the dirty data is not lost.
                self.replacer.lock().record_access(frame_id);
                self.replacer.lock().set_evictable(frame_id, true);
                return Err(e);
            }
            self.page_table.write().remove(&old_page_id);
            trace!(
                page_id = %old_page_id,
                %frame_id,
                page_type = ?frame.resident_type(),
                "evicted page"
            );
        }
        frame.release();

        Ok(frame_id)
    }

    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if !frame.is_dirty() {
            return Ok(());
        }

        {
            let page = frame.page();
            self.disk_manager.lock().write_page(page_id, &page)?;
        }
        frame.clear_dirty();
        BufferPoolStats::bump(&self.stats.pages_written);
        Ok(())
    }
}
