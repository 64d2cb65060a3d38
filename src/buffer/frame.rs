//! Frame - one slot of the buffer pool.
//!
//! A [`Frame`] owns a page-sized buffer and the state the pool needs to
//! share and recycle it:
//! - which index page is resident (metadata, internal node, or leaf)
//! - how many guards or explicit pins hold it
//! - whether it must be written back before reuse

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::{Page, PageType};

/// A slot holding at most one page of the index file.
///
/// The pool allocates all frames up front. A frame moves between three
/// states: free (no page), resident and pinned, resident and evictable.
///
/// # Thread Safety
/// - `page`: `RwLock`, shared by read guards, exclusive for write guards.
///   A tree descent holds a parent's lock while it locks the child, so two
///   frames can be locked by one thread at once.
/// - `page_id`: `Mutex`, changes only on load and release
/// - `pin_count`, `is_dirty`: atomics, updated without the page lock
pub struct Frame {
    /// Page bytes, including the 13-byte header.
    page: RwLock<Page>,

    /// Resident page, or `None` for a free frame.
    page_id: Mutex<Option<PageId>>,

    /// Guards plus explicit pins (a scan cursor holds one on its leaf).
    pin_count: AtomicU32,

    /// Set when a write guard or `unpin_page(.., true)` releases the frame.
    is_dirty: AtomicBool,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Page contents
    // ========================================================================

    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Make `page_id` resident with one pin. The buffer is filled from
    /// `source`, or zeroed for a freshly allocated page.
    ///
    /// The frame must be free.
    pub fn load(&self, page_id: PageId, source: Option<&Page>) {
        {
            let mut page = self.page.write();
            match source {
                Some(source) => page.as_mut_slice().copy_from_slice(source.as_slice()),
                None => page.reset(),
            }
        }
        *self.page_id.lock() = Some(page_id);
        self.pin_count.store(1, Ordering::Relaxed);
    }

    /// Node kind of the resident page, read from its header.
    pub fn resident_type(&self) -> Option<PageType> {
        self.page_id().map(|_| self.page.read().page_type())
    }

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    /// Drop the page binding after eviction. The buffer is overwritten by the
    /// next [`load`](Self::load), so its bytes are left as they are.
    pub fn release(&self) {
        *self.page_id.lock() = None;
        self.clear_dirty();
    }

    // ========================================================================
    // Pins
    // ========================================================================

    /// Increment the pin count, returning the new value.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count, returning the new value.
    ///
    /// # Panics
    /// Panics if the frame is not pinned.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
