//! Page identifier type.

use std::fmt;

/// Identifies a page within an index file.
///
/// Page `N` lives at byte offset `N × PAGE_SIZE`. Page 0 always holds the
/// index metadata, which is why a stored page id of 0 can double as the
/// "no page" marker inside node links.
///
/// # Example
/// ```
/// use attrindex::PageId;
///
/// let page_id = PageId::new(42);
/// assert_eq!(page_id.as_u32(), 42);
/// assert!(!page_id.is_meta());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// The metadata page of every index file.
    pub const META: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Raw on-disk value.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this is the metadata page.
    #[inline]
    pub fn is_meta(self) -> bool {
        self == Self::META
    }

    /// Decode a node link where 0 means "no page".
    #[inline]
    pub fn from_link(raw: u32) -> Option<PageId> {
        (raw != 0).then_some(PageId(raw))
    }

    /// Encode an optional node link, inverse of [`PageId::from_link`].
    #[inline]
    pub fn to_link(page_id: Option<PageId>) -> u32 {
        page_id.map_or(0, |pid| pid.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({})", self.0)
    }
}
