//! RAII guards for page access.
//!
//! A guard is a pin plus a lock on one frame:
//! - [`PageReadGuard`] - shared access, used by scans and read descents
//! - [`PageWriteGuard`] - exclusive access, used by inserts and splits;
//!   the page is dirty once the guard is released
//!
//! Dropping a guard releases the lock first and then the pin, so a frame is
//! never evictable while someone can still read its bytes.
//!
//! # Coupling
//! A descent fetches the child's guard before dropping the parent's:
//! ```ignore
//! let mut guard = pool.fetch_page_read(root)?;
//! while !is_leaf(&guard) {
//!     let child = pool.fetch_page_read(route(&guard, key))?;
//!     guard = child; // parent unlocked and unpinned here
//! }
//! ```

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// One pin on a frame, returned to the pool on drop.
struct FramePin<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// Whether releasing the pin marks the frame dirty.
    dirties: bool,
}

impl Drop for FramePin<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_frame(self.frame_id, self.dirties);
    }
}

/// Shared, read-only access to a pinned page.
///
/// Any number of read guards may exist for one page.
pub struct PageReadGuard<'a> {
    // Field order is drop order: unlock, then unpin.
    lock: RwLockReadGuard<'a, Page>,
    pin: FramePin<'a>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            lock,
            pin: FramePin {
                bpm,
                frame_id,
                page_id,
                dirties: false,
            },
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

/// Exclusive access to a pinned page.
///
/// Every write guard dirties its page on release, whether or not the bytes
/// changed.
pub struct PageWriteGuard<'a> {
    lock: RwLockWriteGuard<'a, Page>,
    pin: FramePin<'a>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            lock,
            pin: FramePin {
                bpm,
                frame_id,
                page_id,
                dirties: true,
            },
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.page_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}
