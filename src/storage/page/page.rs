//! Page - the fixed-size unit of storage.
//!
//! A [`Page`] is a raw byte array moved between disk and the buffer pool.
//! It carries no interpretation beyond the shared [`PageHeader`]; node and
//! metadata layouts are imposed on top of it by the index codecs.

use crate::common::config::PAGE_SIZE;

use super::page_header::{PageHeader, PageType};

/// A page of data (`PAGE_SIZE` bytes, 4096-aligned).
///
/// `Page` is not `Clone` outside tests; copying a page should be a visible
/// decision.
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Type tag from the header.
    #[inline]
    pub fn page_type(&self) -> PageType {
        PageHeader::page_type_of(&self.data)
    }

    /// Compute and store the checksum. Call after the last modification.
    pub fn update_checksum(&mut self) {
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the stored checksum.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut copy = Page::new();
        copy.data.copy_from_slice(&self.data);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_new_page_is_invalid_type() {
        let page = Page::new();
        assert_eq!(page.page_type(), PageType::Invalid);
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.as_mut_slice()[0] = PageType::BTreeLeaf as u8;
        page.as_mut_slice()[4095] = 0xCD;

        page.reset();

        assert_eq!(page.page_type(), PageType::Invalid);
        assert_eq!(page.as_slice()[4095], 0);
    }

    #[test]
    fn test_checksum_roundtrip() {
        let mut page = Page::new();
        PageHeader::new(PageType::IndexMeta).write_to(page.as_mut_slice());
        page.as_mut_slice()[200] = 0x5A;

        page.update_checksum();
        assert!(page.verify_checksum());

        let mut corrupted = page.clone();
        corrupted.as_mut_slice()[200] = 0x5B;
        assert!(!corrupted.verify_checksum());
    }
}
