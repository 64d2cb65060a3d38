//! FIFO (first-in, first-out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::common::FrameId;

/// Evicts the frame that was loaded earliest among those not pinned.
///
/// Re-accessing a frame does not move it in the queue.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Load order, oldest at the front. Each frame appears at most once.
    queue: VecDeque<FrameId>,
    /// Frames whose pin count is zero.
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a load of or access to `frame_id`.
    pub fn record_access(&mut self, frame_id: FrameId) {
        if !self.queue.contains(&frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    /// Track whether the frame may currently be chosen as a victim.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Remove and return the oldest evictable frame.
    pub fn evict(&mut self) -> Option<FrameId> {
        let position = self
            .queue
            .iter()
            .position(|frame_id| self.evictable.contains(frame_id))?;
        let victim = self.queue.remove(position)?;
        self.evictable.remove(&victim);
        Some(victim)
    }

    /// Number of frames that could be evicted right now.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(id: usize) -> FrameId {
        FrameId::new(id)
    }

    #[test]
    fn test_fifo_order() {
        let mut replacer = FifoReplacer::new();
        for id in 0..3 {
            replacer.record_access(fid(id));
            replacer.set_evictable(fid(id), true);
        }
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(fid(0)));
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), Some(fid(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_fifo_skips_pinned_and_keeps_them_queued() {
        let mut replacer = FifoReplacer::new();
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.set_evictable(fid(1), true);

        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), None);

        // Frame 0 is still queued and becomes a victim once unpinned.
        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.evict(), Some(fid(0)));
    }

    #[test]
    fn test_fifo_reaccess_does_not_reorder() {
        let mut replacer = FifoReplacer::new();
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.record_access(fid(0));
        replacer.set_evictable(fid(0), true);
        replacer.set_evictable(fid(1), true);

        assert_eq!(replacer.evict(), Some(fid(0)));
        assert_eq!(replacer.evict(), Some(fid(1)));
    }
}
