//! Insertion with bottom-up split propagation.
//!
//! The descent records `(page, child slot)` for every internal node on the
//! way down. A split hands its separator and new right sibling to the parent
//! at exactly that slot, so duplicate separators can never misplace a child.
//!
//! Pages are pinned at most two at a time: the node being split and its new
//! sibling. The pair is released before the parent is fetched.

use tracing::debug;

use crate::buffer::{BufferPoolManager, PageWriteGuard};
use crate::common::{PageId, RecordId, Result};
use crate::storage::page::PageType;

use super::key::IndexKey;
use super::metadata::IndexMetadata;
use super::node::{Bias, InternalNode, LeafNode};
use super::search::{descend_to_leaf, expect_type, DescentPath, LeafHit};

/// A finished split waiting to be installed one level up.
struct Promotion<K> {
    left: PageId,
    separator: K,
    right: PageId,
}

/// Insert `(key, rid)`, splitting and growing the root as needed.
///
/// `meta` is updated in place and rewritten to the metadata page when the
/// root changes.
pub fn insert_entry<K: IndexKey>(
    pool: &BufferPoolManager,
    meta: &mut IndexMetadata,
    key: K,
    rid: RecordId,
) -> Result<()> {
    let mut path = DescentPath::with_capacity(meta.height as usize);
    let LeafHit {
        guard: leaf_guard,
        position,
    } = descend_to_leaf::<K, PageWriteGuard>(
        pool,
        meta.root_page_id,
        meta.height,
        &key,
        Bias::Upper,
        Some(&mut path),
    )?;

    let Some(mut promotion) = insert_into_leaf(pool, meta, leaf_guard, position, key, rid)? else {
        return Ok(());
    };

    while let Some((parent_id, slot)) = path.pop() {
        match insert_into_internal(pool, meta, parent_id, slot, promotion)? {
            Some(next) => promotion = next,
            None => return Ok(()),
        }
    }

    grow_root(pool, meta, promotion)
}

/// Place the entry in its leaf. Returns the promotion if the leaf split.
fn insert_into_leaf<K: IndexKey>(
    pool: &BufferPoolManager,
    meta: &IndexMetadata,
    mut guard: PageWriteGuard<'_>,
    position: usize,
    key: K,
    rid: RecordId,
) -> Result<Option<Promotion<K>>> {
    let capacity = meta.layout.leaf_capacity;
    let occupancy = LeafNode::<_, K>::new(guard.as_slice()).occupancy();

    if occupancy < capacity {
        LeafNode::<_, K>::new(guard.as_mut_slice()).insert_at(position, &key, rid);
        return Ok(None);
    }

    // Allocate before the old leaf changes so a full pool leaves it intact.
    let mut right_guard = pool.new_page()?;
    let left_id = guard.page_id();
    let right_id = right_guard.page_id();

    let mut left = LeafNode::<_, K>::new(guard.as_mut_slice());
    let mut right = LeafNode::<_, K>::new(right_guard.as_mut_slice());
    right.init();

    left.insert_at(position, &key, rid);
    let total = left.occupancy();
    left.move_upper_into(&mut right, total - total / 2);

    right.set_right_sibling(left.right_sibling());
    left.set_right_sibling(Some(right_id));
    let separator = right.key_at(0);

    debug!(
        left = %left_id,
        right = %right_id,
        left_entries = left.occupancy(),
        right_entries = right.occupancy(),
        "split leaf"
    );

    Ok(Some(Promotion {
        left: left_id,
        separator,
        right: right_id,
    }))
}

/// Install a promotion in its parent. Returns the parent's own promotion if
/// the parent split too.
fn insert_into_internal<K: IndexKey>(
    pool: &BufferPoolManager,
    meta: &IndexMetadata,
    parent_id: PageId,
    slot: usize,
    promotion: Promotion<K>,
) -> Result<Option<Promotion<K>>> {
    let mut guard = pool.fetch_page_write(parent_id)?;
    expect_type(&guard, parent_id, PageType::BTreeInternal)?;

    let capacity = meta.layout.internal_capacity;
    let (occupancy, level) = {
        let node = InternalNode::<_, K>::new(guard.as_slice());
        debug_assert_eq!(node.child_at(slot), promotion.left);
        (node.occupancy(), node.level())
    };

    if occupancy < capacity {
        InternalNode::<_, K>::new(guard.as_mut_slice()).insert_at(
            slot,
            &promotion.separator,
            promotion.right,
        );
        return Ok(None);
    }

    let mut right_guard = pool.new_page()?;
    let right_id = right_guard.page_id();

    let mut left = InternalNode::<_, K>::new(guard.as_mut_slice());
    let mut right = InternalNode::<_, K>::new(right_guard.as_mut_slice());
    right.init(level);

    left.insert_at(slot, &promotion.separator, promotion.right);
    let median = left.split_into(&mut right);

    debug!(
        left = %parent_id,
        right = %right_id,
        left_keys = left.occupancy(),
        right_keys = right.occupancy(),
        "split internal node"
    );

    Ok(Some(Promotion {
        left: parent_id,
        separator: median,
        right: right_id,
    }))
}

/// The split reached the top: put a new root over the two halves.
fn grow_root<K: IndexKey>(
    pool: &BufferPoolManager,
    meta: &mut IndexMetadata,
    promotion: Promotion<K>,
) -> Result<()> {
    debug_assert_eq!(promotion.left, meta.root_page_id);
    let level = u8::from(meta.height == 1);

    let root_id = {
        let mut guard = pool.new_page()?;
        InternalNode::<_, K>::new(guard.as_mut_slice()).init_root(
            promotion.left,
            &promotion.separator,
            promotion.right,
            level,
        );
        guard.page_id()
    };

    meta.root_page_id = root_id;
    meta.height += 1;
    debug!(root = %root_id, height = meta.height, "grew root");

    let mut meta_guard = pool.fetch_page_write(PageId::META)?;
    meta.encode(&mut meta_guard);
    Ok(())
}
