//! The index handle: bootstrap, insertion, scans, and flush on drop.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::buffer::BufferPoolManager;
use crate::common::config::{IndexConfig, MIN_POOL_SIZE};
use crate::common::{Error, PageId, RecordId, Result};
use crate::relation::Relation;
use crate::storage::DiskManager;

use super::insert;
use super::key::IndexKey;
use super::metadata::IndexMetadata;
use super::node::{LeafNode, NodeLayout};
use super::scan::{Operator, ScanCursor, ScanRange, ScanState};
use super::verify::{self, TreeStats};

/// A B+Tree over one fixed-width attribute of a relation, stored in the file
/// `"{relation}.{attr_byte_offset}"`.
///
/// # Example
/// ```no_run
/// use attrindex::relation::MemRelation;
/// use attrindex::{BTreeIndex, IndexConfig, Operator};
///
/// # fn main() -> attrindex::Result<()> {
/// let mut relation = MemRelation::new("orders");
/// for amount in [30i32, 10, 20] {
///     relation.push(amount.to_le_bytes().to_vec());
/// }
///
/// let mut index = BTreeIndex::<i32>::open_or_build("/tmp", &relation, 0, IndexConfig::default())?;
/// let rids = index.scan_range(10, Operator::Gte, 20, Operator::Lte)?;
/// assert_eq!(rids.len(), 2);
/// # Ok(())
/// # }
/// ```
///
/// Inserting while a scan is active is not supported: the cursor may skip
/// or repeat entries moved by a split.
pub struct BTreeIndex<K: IndexKey> {
    name: String,
    pool: BufferPoolManager,
    meta: IndexMetadata,
    cursor: ScanCursor<K>,
}

impl<K: IndexKey> BTreeIndex<K> {
    /// Open the index for `relation` at `attr_byte_offset` in `dir`, building
    /// it from a full scan of the relation if the file does not exist.
    ///
    /// # Errors
    /// - `Error::InvalidMetadata` if an existing file indexes a different
    ///   relation, offset, or datatype
    /// - `Error::ChecksumMismatch` / `Error::CorruptedPage` for a damaged file
    /// - `Error::AttributeOutOfBounds` if a record is too short while building
    /// - `Error::AttributeOffsetTooLarge` if the offset cannot be stored
    /// - storage faults
    pub fn open_or_build<R>(
        dir: impl AsRef<Path>,
        relation: &R,
        attr_byte_offset: usize,
        config: IndexConfig,
    ) -> Result<Self>
    where
        R: Relation + ?Sized,
    {
        if u32::try_from(attr_byte_offset).is_err() {
            return Err(Error::AttributeOffsetTooLarge(attr_byte_offset));
        }
        let name = index_file_name(relation.name(), attr_byte_offset);
        let path = dir.as_ref().join(&name);

        if path.exists() {
            return Self::open_existing(path, name, relation.name(), attr_byte_offset, config);
        }

        let mut index = Self::create_empty(&path, name, relation.name(), attr_byte_offset, config)?;
        if let Err(e) = index.populate(relation) {
            drop(index);
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }
        Ok(index)
    }

    fn open_existing(
        path: PathBuf,
        name: String,
        relation_name: &str,
        attr_byte_offset: usize,
        config: IndexConfig,
    ) -> Result<Self> {
        let pool = BufferPoolManager::new(pool_size(&config), DiskManager::open(&path)?);
        let meta = {
            let meta_guard = pool.fetch_page_read(PageId::META)?;
            IndexMetadata::decode(&meta_guard)?
        };
        meta.validate(relation_name, attr_byte_offset, K::DATATYPE)?;

        if !meta.layout.fits::<K>() {
            return Err(Error::CorruptedPage {
                page_id: PageId::META.as_u32(),
                reason: format!("node capacities {:?} do not fit the key", meta.layout),
            });
        }

        info!(
            index = %name,
            root = %meta.root_page_id,
            height = meta.height,
            pages = pool.disk_page_count(),
            "opened index"
        );
        Ok(Self {
            name,
            pool,
            meta,
            cursor: ScanCursor::new(),
        })
    }

    /// Create the file with a metadata page and an empty root leaf.
    fn create_empty(
        path: &Path,
        name: String,
        relation_name: &str,
        attr_byte_offset: usize,
        config: IndexConfig,
    ) -> Result<Self> {
        let pool = BufferPoolManager::new(pool_size(&config), DiskManager::create(path)?);
        let layout = NodeLayout::for_key::<K>(&config);

        let meta = {
            let mut meta_guard = pool.new_page()?;
            debug_assert_eq!(meta_guard.page_id(), PageId::META);

            let mut root_guard = pool.new_page()?;
            LeafNode::<_, K>::new(root_guard.as_mut_slice()).init();

            let meta = IndexMetadata::new(
                relation_name,
                attr_byte_offset,
                K::DATATYPE,
                root_guard.page_id(),
                layout,
            );
            meta.encode(&mut meta_guard);
            meta
        };

        debug!(
            index = %name,
            leaf_capacity = layout.leaf_capacity,
            internal_capacity = layout.internal_capacity,
            "created index file"
        );
        Ok(Self {
            name,
            pool,
            meta,
            cursor: ScanCursor::new(),
        })
    }

    /// Insert every record of `relation`, then flush.
    fn populate<R: Relation + ?Sized>(&mut self, relation: &R) -> Result<()> {
        let offset = self.meta.attr_byte_offset;
        let mut count = 0usize;
        for item in relation.scan() {
            let (rid, record) = item?;
            self.insert_entry(K::from_record(&record, offset)?, rid)?;
            count += 1;
        }
        self.flush()?;

        info!(
            index = %self.name,
            entries = count,
            height = self.meta.height,
            pages = self.pool.disk_page_count(),
            "built index"
        );
        Ok(())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Insert `(key, rid)`. Equal keys are kept in insertion order.
    pub fn insert_entry(&mut self, key: K, rid: RecordId) -> Result<()> {
        insert::insert_entry(&self.pool, &mut self.meta, key, rid)
    }

    /// Begin a scan over the range given by the two bounds, ending any scan
    /// in progress.
    ///
    /// # Errors
    /// - `Error::InvalidOperators` unless `low_op` is `Gt`/`Gte` and `high_op`
    ///   is `Lt`/`Lte`
    /// - `Error::InvalidRange` if `low > high`
    /// - `Error::NoMatchingKey` if nothing is in range
    pub fn start_scan(
        &mut self,
        low: K,
        low_op: Operator,
        high: K,
        high_op: Operator,
    ) -> Result<()> {
        let range = ScanRange::new(low, low_op, high, high_op)?;
        self.cursor.start(&self.pool, &self.meta, range)
    }

    /// Next record id in key order.
    ///
    /// # Errors
    /// `Error::ScanNotInitialized` without a scan, `Error::ScanCompleted`
    /// once the range is exhausted.
    pub fn scan_next(&mut self) -> Result<RecordId> {
        self.cursor.next(&self.pool)
    }

    /// End the current scan and release its page.
    pub fn end_scan(&mut self) -> Result<()> {
        self.cursor.end(&self.pool)
    }

    /// Collect every record id in range. An empty range yields an empty
    /// vector rather than `Error::NoMatchingKey`.
    pub fn scan_range(
        &mut self,
        low: K,
        low_op: Operator,
        high: K,
        high_op: Operator,
    ) -> Result<Vec<RecordId>> {
        match self.start_scan(low, low_op, high, high_op) {
            Ok(()) => {}
            Err(Error::NoMatchingKey) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }

        let mut rids = Vec::new();
        loop {
            match self.scan_next() {
                Ok(rid) => rids.push(rid),
                Err(Error::ScanCompleted) => break,
                Err(e) => {
                    let _ = self.end_scan();
                    return Err(e);
                }
            }
        }
        self.end_scan()?;
        Ok(rids)
    }

    /// Write every dirty page and sync the file.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all_pages()
    }

    /// Check the structure of the whole tree.
    pub fn verify(&self) -> Result<TreeStats> {
        verify::verify::<K>(&self.pool, &self.meta)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn metadata(&self) -> &IndexMetadata {
        &self.meta
    }

    /// File name of the index, `"{relation}.{attr_byte_offset}"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn scan_state(&self) -> ScanState {
        self.cursor.state()
    }

    pub fn buffer_pool(&self) -> &BufferPoolManager {
        &self.pool
    }

    pub fn leaf_capacity(&self) -> usize {
        self.meta.layout.leaf_capacity
    }

    pub fn internal_capacity(&self) -> usize {
        self.meta.layout.internal_capacity
    }
}

impl<K: IndexKey> Drop for BTreeIndex<K> {
    fn drop(&mut self) {
        if self.cursor.state() != ScanState::Idle {
            if let Err(e) = self.cursor.end(&self.pool) {
                warn!(index = %self.name, error = %e, "failed to end scan on close");
            }
        }
        if let Err(e) = self.pool.flush_all_pages() {
            warn!(index = %self.name, error = %e, "failed to flush index on close");
        }
    }
}

/// File name for the index on `relation_name` at `attr_byte_offset`.
pub fn index_file_name(relation_name: &str, attr_byte_offset: usize) -> String {
    format!("{relation_name}.{attr_byte_offset}")
}

fn pool_size(config: &IndexConfig) -> usize {
    config.pool_size.max(MIN_POOL_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::btree::key::FixedStr;
    use crate::relation::MemRelation;
    use tempfile::tempdir;

    fn small() -> IndexConfig {
        IndexConfig::default()
            .with_pool_size(8)
            .with_leaf_capacity(3)
            .with_internal_capacity(3)
    }

    #[test]
    fn test_build_empty_relation() {
        let dir = tempdir().unwrap();
        let rel = MemRelation::new("empty");

        let mut index = BTreeIndex::<i32>::open_or_build(dir.path(), &rel, 4, small()).unwrap();

        assert_eq!(index.name(), "empty.4");
        assert_eq!(index.height(), 1);
        assert!(dir.path().join("empty.4").exists());
        assert!(matches!(
            index.start_scan(0, Operator::Gte, 10, Operator::Lte),
            Err(Error::NoMatchingKey)
        ));
        assert_eq!(index.scan_state(), ScanState::Idle);
    }

    #[test]
    fn test_capacities_come_from_config() {
        let dir = tempdir().unwrap();
        let rel = MemRelation::new("r");

        let index = BTreeIndex::<FixedStr>::open_or_build(dir.path(), &rel, 0, small()).unwrap();
        assert_eq!(index.leaf_capacity(), 3);
        assert_eq!(index.internal_capacity(), 3);
        assert_eq!(index.metadata().datatype, FixedStr::DATATYPE);
    }

    #[test]
    fn test_failed_build_removes_file() {
        let dir = tempdir().unwrap();
        let mut rel = MemRelation::new("short");
        rel.push(vec![1, 2, 3, 4]);
        rel.push(vec![1, 2]);

        let result = BTreeIndex::<i32>::open_or_build(dir.path(), &rel, 0, small());

        assert!(matches!(result, Err(Error::AttributeOutOfBounds { len: 2, .. })));
        assert!(!dir.path().join("short.0").exists());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_offset_is_rejected() {
        let dir = tempdir().unwrap();
        let rel = MemRelation::new("wide");
        let offset = u32::MAX as usize + 5;

        let result = BTreeIndex::<i32>::open_or_build(dir.path(), &rel, offset, small());

        assert!(matches!(result, Err(Error::AttributeOffsetTooLarge(o)) if o == offset));
        assert!(!dir.path().join(index_file_name("wide", offset)).exists());
    }

    #[test]
    fn test_tiny_pool_is_raised_to_minimum() {
        let dir = tempdir().unwrap();
        let mut rel = MemRelation::new("tiny");
        for i in 0..40i32 {
            rel.push(i.to_le_bytes().to_vec());
        }

        let config = small().with_pool_size(1);
        let mut index = BTreeIndex::<i32>::open_or_build(dir.path(), &rel, 0, config).unwrap();

        assert_eq!(index.buffer_pool().pool_size(), MIN_POOL_SIZE);
        assert_eq!(index.scan_range(0, Operator::Gte, 39, Operator::Lte).unwrap().len(), 40);
        index.verify().unwrap();
    }
}
