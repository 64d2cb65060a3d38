//! Root-to-leaf descent.

use std::ops::Deref;

use tracing::trace;

use crate::buffer::{BufferPoolManager, PageReadGuard, PageWriteGuard};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageType};

use super::key::IndexKey;
use super::node::{Bias, InternalNode, LeafNode};

/// Internal pages passed on the way down, with the child slot taken in each.
pub type DescentPath = Vec<(PageId, usize)>;

/// How the leaf at the end of a descent is latched.
///
/// Internal nodes are always read-latched; scans take the leaf shared and
/// insertion takes it exclusive.
pub trait LeafAccess<'a>: Deref<Target = Page> + Sized {
    fn fetch(pool: &'a BufferPoolManager, page_id: PageId) -> Result<Self>;
}

impl<'a> LeafAccess<'a> for PageReadGuard<'a> {
    fn fetch(pool: &'a BufferPoolManager, page_id: PageId) -> Result<Self> {
        pool.fetch_page_read(page_id)
    }
}

impl<'a> LeafAccess<'a> for PageWriteGuard<'a> {
    fn fetch(pool: &'a BufferPoolManager, page_id: PageId) -> Result<Self> {
        pool.fetch_page_write(page_id)
    }
}

/// A pinned leaf and the position of the search key inside it.
pub struct LeafHit<G> {
    pub guard: G,
    pub position: usize,
}

/// Descend from `root` to the leaf that would hold `key`.
///
/// `height` is the tree height from the metadata; a height of 1 means the
/// root is itself the leaf. Each child is pinned before its parent is
/// released, so at most two pages are pinned at once. When `path` is given,
/// every internal page visited is appended with the slot followed.
///
/// # Errors
/// Storage faults from the buffer pool, or `Error::CorruptedPage` when a page
/// on the way down does not carry the expected node type.
pub fn descend_to_leaf<'a, K, G>(
    pool: &'a BufferPoolManager,
    root: PageId,
    height: u32,
    key: &K,
    bias: Bias,
    mut path: Option<&mut DescentPath>,
) -> Result<LeafHit<G>>
where
    K: IndexKey,
    G: LeafAccess<'a>,
{
    if height <= 1 {
        return locate(G::fetch(pool, root)?, root, key, bias);
    }

    let mut current_id = root;
    let mut current = pool.fetch_page_read(root)?;
    loop {
        expect_type(&current, current_id, PageType::BTreeInternal)?;
        let node = InternalNode::<_, K>::new(current.as_slice());
        let slot = node.route(key, bias);
        let child = node.child_at(slot);
        let leaf_level = node.children_are_leaves();
        trace!(page_id = %current_id, slot, child = %child, "descend");

        if let Some(path) = path.as_deref_mut() {
            path.push((current_id, slot));
        }

        if leaf_level {
            let leaf = G::fetch(pool, child)?;
            drop(current);
            return locate(leaf, child, key, bias);
        }

        current = pool.fetch_page_read(child)?;
        current_id = child;
    }
}

fn locate<K: IndexKey, G: Deref<Target = Page>>(
    guard: G,
    page_id: PageId,
    key: &K,
    bias: Bias,
) -> Result<LeafHit<G>> {
    expect_type(&guard, page_id, PageType::BTreeLeaf)?;
    let position = LeafNode::<_, K>::new(guard.as_slice()).position_of(key, bias);
    Ok(LeafHit { guard, position })
}

pub(crate) fn expect_type(page: &Page, page_id: PageId, expected: PageType) -> Result<()> {
    let found = page.page_type();
    if found == expected {
        Ok(())
    } else {
        Err(Error::CorruptedPage {
            page_id: page_id.as_u32(),
            reason: format!("expected {expected:?}, found {found:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RecordId;
    use crate::storage::DiskManager;
    use tempfile::tempdir;

    fn leaf_page(bpm: &BufferPoolManager, keys: &[i32], sibling: Option<PageId>) -> PageId {
        let mut guard = bpm.new_page().unwrap();
        let page_id = guard.page_id();
        let mut leaf = LeafNode::<_, i32>::new(guard.as_mut_slice());
        leaf.init();
        for (i, &k) in keys.iter().enumerate() {
            leaf.insert_at(i, &k, RecordId::new(page_id.as_u32(), i as u16));
        }
        leaf.set_right_sibling(sibling);
        page_id
    }

    /// Two leaves under one root: [1, 3, 5] | [5, 7, 9], separator 5.
    fn two_level_tree(bpm: &BufferPoolManager) -> PageId {
        let right = leaf_page(bpm, &[5, 7, 9], None);
        let left = leaf_page(bpm, &[1, 3, 5], Some(right));

        let mut guard = bpm.new_page().unwrap();
        InternalNode::<_, i32>::new(guard.as_mut_slice()).init_root(left, &5, right, 1);
        guard.page_id()
    }

    fn setup() -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("t.0")).unwrap();
        (BufferPoolManager::new(4, dm), dir)
    }

    #[test]
    fn test_single_leaf_root() {
        let (bpm, _dir) = setup();
        let root = leaf_page(&bpm, &[2, 4, 6], None);

        let hit: LeafHit<PageReadGuard> =
            descend_to_leaf(&bpm, root, 1, &4, Bias::Upper, None).unwrap();
        assert_eq!(hit.guard.page_id(), root);
        assert_eq!(hit.position, 2);
    }

    #[test]
    fn test_bias_picks_side_of_separator() {
        let (bpm, _dir) = setup();
        let root = two_level_tree(&bpm);

        let mut path = DescentPath::new();
        let upper: LeafHit<PageWriteGuard> =
            descend_to_leaf(&bpm, root, 2, &5, Bias::Upper, Some(&mut path)).unwrap();
        assert_eq!(upper.guard.page_id(), PageId::new(0));
        assert_eq!(upper.position, 1);
        assert_eq!(path, vec![(root, 1)]);
        drop(upper);

        let lower: LeafHit<PageReadGuard> =
            descend_to_leaf(&bpm, root, 2, &5, Bias::Lower, None).unwrap();
        assert_eq!(lower.guard.page_id(), PageId::new(1));
        assert_eq!(lower.position, 2);
    }

    #[test]
    fn test_descent_releases_pins() {
        let (bpm, _dir) = setup();
        let root = two_level_tree(&bpm);

        {
            let _hit: LeafHit<PageReadGuard> =
                descend_to_leaf(&bpm, root, 2, &100, Bias::Lower, None).unwrap();
            assert_eq!(bpm.total_pins(), 1);
        }
        assert_eq!(bpm.total_pins(), 0);
    }

    #[test]
    fn test_wrong_page_type_is_corruption() {
        let (bpm, _dir) = setup();
        let root = leaf_page(&bpm, &[1], None);

        let result: Result<LeafHit<PageReadGuard>> =
            descend_to_leaf(&bpm, root, 2, &1, Bias::Lower, None);
        assert!(matches!(
            result,
            Err(Error::CorruptedPage { page_id, .. }) if page_id == root.as_u32()
        ));
        assert_eq!(bpm.total_pins(), 0);
    }
}
