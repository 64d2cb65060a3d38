//! Frame identifier type.

use std::fmt;

/// Index of a slot in the buffer pool's frame vector.
///
/// Frames are stored in a `Vec<Frame>`, so a `usize` indexes them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_display() {
        assert_eq!(FrameId::new(3).0, 3);
        assert_eq!(format!("{}", FrameId::new(42)), "Frame(42)");
    }
}
