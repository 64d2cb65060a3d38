//! Base relations an index can be built over.
//!
//! The index only needs a relation's name and a sequential scan of its
//! records. [`MemRelation`] keeps the records in memory; storage engines
//! implement [`Relation`] over their own heap files.

use crate::common::{RecordId, Result};

/// One record of a sequential scan: its id and raw bytes.
pub type ScanItem = Result<(RecordId, Vec<u8>)>;

/// A relation that can be scanned from start to end.
pub trait Relation {
    /// Name used for the index file (`"{name}.{attr_byte_offset}"`).
    fn name(&self) -> &str;

    /// Every record, in storage order.
    fn scan(&self) -> Box<dyn Iterator<Item = ScanItem> + '_>;
}

/// Records handed out per synthetic page by [`MemRelation::push`].
const RECORDS_PER_PAGE: u16 = 64;

/// An in-memory relation with synthetic record ids.
///
/// # Example
/// ```
/// use attrindex::relation::{MemRelation, Relation};
///
/// let mut rel = MemRelation::new("accounts");
/// let rid = rel.push(42i32.to_le_bytes().to_vec());
/// assert_eq!(rel.scan().count(), 1);
/// assert_eq!(rid.page_number, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemRelation {
    name: String,
    records: Vec<(RecordId, Vec<u8>)>,
}

impl MemRelation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    /// Append a record, assigning the next record id.
    ///
    /// Ids fill slots `0..64` of page 1, then page 2, and so on.
    pub fn push(&mut self, record: Vec<u8>) -> RecordId {
        let n = self.records.len();
        let per_page = usize::from(RECORDS_PER_PAGE);
        let rid = RecordId::new((n / per_page + 1) as u32, (n % per_page) as u16);
        self.records.push((rid, record));
        rid
    }

    /// Append a record under a caller-chosen id.
    pub fn push_with_id(&mut self, rid: RecordId, record: Vec<u8>) {
        self.records.push((rid, record));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Relation for MemRelation {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self) -> Box<dyn Iterator<Item = ScanItem> + '_> {
        Box::new(self.records.iter().map(|(rid, record)| Ok((*rid, record.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_ids_across_pages() {
        let mut rel = MemRelation::new("r");
        let rids: Vec<RecordId> = (0..130)
            .map(|i: u32| rel.push(i.to_le_bytes().to_vec()))
            .collect();

        assert_eq!(rids[0], RecordId::new(1, 0));
        assert_eq!(rids[63], RecordId::new(1, 63));
        assert_eq!(rids[64], RecordId::new(2, 0));
        assert_eq!(rids[129], RecordId::new(3, 1));
        assert_eq!(rel.len(), 130);
    }

    #[test]
    fn test_scan_preserves_order() {
        let mut rel = MemRelation::new("r");
        rel.push_with_id(RecordId::new(9, 9), vec![1]);
        rel.push(vec![2]);

        let scanned: Vec<(RecordId, Vec<u8>)> = rel.scan().map(|r| r.unwrap()).collect();
        assert_eq!(scanned[0], (RecordId::new(9, 9), vec![1]));
        assert_eq!(scanned[1].1, vec![2]);
        assert_eq!(rel.name(), "r");
    }
}
