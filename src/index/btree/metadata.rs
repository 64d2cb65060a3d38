//! Index metadata page (always page 0 of the index file).
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       13    PageHeader (type = IndexMeta, checksummed)
//! 13      20    relation name (zero padded)
//! 33      4     attribute byte offset (u32)
//! 37      1     attribute datatype (u8)
//! 38      4     root page id (u32)
//! 42      4     tree height (u32, 1 = root is a leaf)
//! 46      2     leaf capacity (u16)
//! 48      2     internal capacity (u16)
//! ```
//!
//! Node capacities are fixed when the tree is built, so a reopened index
//! keeps splitting the way it was built regardless of the caller's config.

use crate::common::config::RELATION_NAME_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

use super::key::Datatype;
use super::node::NodeLayout;

const OFFSET_NAME: usize = PageHeader::SIZE;
const OFFSET_ATTR_OFFSET: usize = OFFSET_NAME + RELATION_NAME_SIZE;
const OFFSET_DATATYPE: usize = OFFSET_ATTR_OFFSET + 4;
const OFFSET_ROOT: usize = OFFSET_DATATYPE + 1;
const OFFSET_HEIGHT: usize = OFFSET_ROOT + 4;
const OFFSET_LEAF_CAPACITY: usize = OFFSET_HEIGHT + 4;
const OFFSET_INTERNAL_CAPACITY: usize = OFFSET_LEAF_CAPACITY + 2;

/// Descriptor of the indexed attribute plus the current root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    /// Relation name, truncated to `RELATION_NAME_SIZE` bytes.
    pub relation_name: String,
    pub attr_byte_offset: usize,
    pub datatype: Datatype,
    pub root_page_id: PageId,
    /// Levels from root to leaf inclusive.
    pub height: u32,
    pub layout: NodeLayout,
}

impl IndexMetadata {
    /// Metadata for a fresh tree whose root is the leaf `root_page_id`.
    pub fn new(
        relation_name: &str,
        attr_byte_offset: usize,
        datatype: Datatype,
        root_page_id: PageId,
        layout: NodeLayout,
    ) -> Self {
        Self {
            relation_name: truncate_name(relation_name),
            attr_byte_offset,
            datatype,
            root_page_id,
            height: 1,
            layout,
        }
    }

    /// Write into `page`, replacing its header and checksum.
    pub fn encode(&self, page: &mut Page) {
        let data = page.as_mut_slice();
        PageHeader::new(PageType::IndexMeta).write_to(data);

        let name = &mut data[OFFSET_NAME..OFFSET_NAME + RELATION_NAME_SIZE];
        name.fill(0);
        name[..self.relation_name.len()].copy_from_slice(self.relation_name.as_bytes());

        // Offsets past u32::MAX are rejected when the index is opened.
        data[OFFSET_ATTR_OFFSET..OFFSET_ATTR_OFFSET + 4]
            .copy_from_slice(&(self.attr_byte_offset as u32).to_le_bytes());
        data[OFFSET_DATATYPE] = self.datatype as u8;
        data[OFFSET_ROOT..OFFSET_ROOT + 4]
            .copy_from_slice(&self.root_page_id.as_u32().to_le_bytes());
        data[OFFSET_HEIGHT..OFFSET_HEIGHT + 4].copy_from_slice(&self.height.to_le_bytes());
        data[OFFSET_LEAF_CAPACITY..OFFSET_LEAF_CAPACITY + 2]
            .copy_from_slice(&(self.layout.leaf_capacity as u16).to_le_bytes());
        data[OFFSET_INTERNAL_CAPACITY..OFFSET_INTERNAL_CAPACITY + 2]
            .copy_from_slice(&(self.layout.internal_capacity as u16).to_le_bytes());

        page.update_checksum();
    }

    /// Read from `page`, checking its type tag and checksum.
    ///
    /// # Errors
    /// - `Error::CorruptedPage` if the page is not a metadata page or a field
    ///   holds an impossible value
    /// - `Error::ChecksumMismatch` if the contents changed since encoding
    pub fn decode(page: &Page) -> Result<Self> {
        let meta_id = PageId::META.as_u32();
        if page.page_type() != PageType::IndexMeta {
            return Err(Error::CorruptedPage {
                page_id: meta_id,
                reason: format!("expected index metadata, found {:?}", page.page_type()),
            });
        }
        if !page.verify_checksum() {
            return Err(Error::ChecksumMismatch(meta_id));
        }

        let data = page.as_slice();
        let name = &data[OFFSET_NAME..OFFSET_NAME + RELATION_NAME_SIZE];
        let name_len = name.iter().position(|&b| b == 0).unwrap_or(RELATION_NAME_SIZE);

        let datatype = Datatype::from_u8(data[OFFSET_DATATYPE]).ok_or_else(|| {
            Error::CorruptedPage {
                page_id: meta_id,
                reason: format!("unknown datatype tag {}", data[OFFSET_DATATYPE]),
            }
        })?;

        let root = PageId::new(read_u32(data, OFFSET_ROOT));
        let height = read_u32(data, OFFSET_HEIGHT);
        if root.is_meta() || height == 0 {
            return Err(Error::CorruptedPage {
                page_id: meta_id,
                reason: format!("invalid root {root} at height {height}"),
            });
        }

        Ok(Self {
            relation_name: String::from_utf8_lossy(&name[..name_len]).into_owned(),
            attr_byte_offset: read_u32(data, OFFSET_ATTR_OFFSET) as usize,
            datatype,
            root_page_id: root,
            height,
            layout: NodeLayout {
                leaf_capacity: read_u16(data, OFFSET_LEAF_CAPACITY) as usize,
                internal_capacity: read_u16(data, OFFSET_INTERNAL_CAPACITY) as usize,
            },
        })
    }

    /// Compare against the attribute a caller asked to index.
    ///
    /// # Errors
    /// `Error::InvalidMetadata` naming the first field that disagrees.
    pub fn validate(
        &self,
        relation_name: &str,
        attr_byte_offset: usize,
        datatype: Datatype,
    ) -> Result<()> {
        let expected_name = truncate_name(relation_name);
        if self.relation_name != expected_name {
            return Err(Error::InvalidMetadata {
                field: "relation_name",
                expected: expected_name,
                found: self.relation_name.clone(),
            });
        }
        if self.attr_byte_offset != attr_byte_offset {
            return Err(Error::InvalidMetadata {
                field: "attr_byte_offset",
                expected: attr_byte_offset.to_string(),
                found: self.attr_byte_offset.to_string(),
            });
        }
        if self.datatype != datatype {
            return Err(Error::InvalidMetadata {
                field: "datatype",
                expected: datatype.to_string(),
                found: self.datatype.to_string(),
            });
        }
        Ok(())
    }
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

/// Longest prefix of `name` that fits the name field on a char boundary.
fn truncate_name(name: &str) -> String {
    let mut end = name.len().min(RELATION_NAME_SIZE);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexMetadata {
        let layout = NodeLayout {
            leaf_capacity: 4,
            internal_capacity: 3,
        };
        let mut meta = IndexMetadata::new("employees", 8, Datatype::Double, PageId::new(1), layout);
        meta.root_page_id = PageId::new(42);
        meta.height = 3;
        meta
    }

    #[test]
    fn test_encode_decode() {
        let mut page = Page::new();
        sample().encode(&mut page);

        assert_eq!(page.page_type(), PageType::IndexMeta);
        assert_eq!(IndexMetadata::decode(&page).unwrap(), sample());
    }

    #[test]
    fn test_long_relation_name_is_truncated() {
        let meta = IndexMetadata::new(
            "a_relation_name_longer_than_twenty",
            0,
            Datatype::Integer,
            PageId::new(1),
            NodeLayout::max_for::<i32>(),
        );
        assert_eq!(meta.relation_name.len(), RELATION_NAME_SIZE);

        let mut page = Page::new();
        meta.encode(&mut page);
        let decoded = IndexMetadata::decode(&page).unwrap();
        assert_eq!(decoded.relation_name, "a_relation_name_long");
        assert!(decoded
            .validate("a_relation_name_longer_than_twenty", 0, Datatype::Integer)
            .is_ok());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut page = Page::new();
        sample().encode(&mut page);
        page.as_mut_slice()[OFFSET_HEIGHT] ^= 0xFF;

        assert!(matches!(
            IndexMetadata::decode(&page),
            Err(Error::ChecksumMismatch(0))
        ));
    }

    #[test]
    fn test_decode_rejects_other_page_types() {
        let mut page = Page::new();
        PageHeader::set_page_type(page.as_mut_slice(), PageType::BTreeLeaf);

        assert!(matches!(
            IndexMetadata::decode(&page),
            Err(Error::CorruptedPage { page_id: 0, .. })
        ));
    }

    #[test]
    fn test_validate_reports_field() {
        let meta = sample();

        let err = meta.validate("employees", 12, Datatype::Double).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidMetadata {
                field: "attr_byte_offset",
                ..
            }
        ));

        let err = meta.validate("employees", 8, Datatype::Integer).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Index metadata mismatch on datatype: expected INTEGER, found DOUBLE"
        );

        assert!(meta.validate("employees", 8, Datatype::Double).is_ok());
    }
}
