//! Structural checks over a whole tree.
//!
//! Walks every node depth first, pinning one page at a time, and checks:
//! key order inside each node, separator bounds for every subtree, uniform
//! leaf depth, node fill against the tree's capacities, level flags, and
//! that the sibling chain visits the leaves in key order.

use std::cmp::Ordering;
use std::fmt;

use crate::buffer::BufferPoolManager;
use crate::common::{Error, PageId, Result};
use crate::storage::page::PageType;

use super::key::IndexKey;
use super::metadata::IndexMetadata;
use super::node::{InternalNode, LeafNode};

/// Shape of a tree that passed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub height: u32,
    pub internal_nodes: usize,
    pub leaf_nodes: usize,
    pub entries: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tree {{ height: {}, internal: {}, leaves: {}, entries: {} }}",
            self.height, self.internal_nodes, self.leaf_nodes, self.entries
        )
    }
}

struct Walk<'a, K> {
    pool: &'a BufferPoolManager,
    meta: &'a IndexMetadata,
    stats: TreeStats,
    /// Leaves in key order, with the sibling link each one stores.
    leaves: Vec<(PageId, Option<PageId>)>,
    last_key: Option<K>,
}

/// Verify the tree described by `meta`.
///
/// # Errors
/// `Error::CorruptedPage` naming the first page that breaks an invariant, or
/// a storage fault.
pub fn verify<K: IndexKey>(pool: &BufferPoolManager, meta: &IndexMetadata) -> Result<TreeStats> {
    let mut walk = Walk::<K> {
        pool,
        meta,
        stats: TreeStats {
            height: meta.height,
            ..TreeStats::default()
        },
        leaves: Vec::new(),
        last_key: None,
    };
    walk.visit(meta.root_page_id, 1, None, None)?;
    walk.check_chain()?;
    Ok(walk.stats)
}

fn corrupted(page_id: PageId, reason: impl Into<String>) -> Error {
    Error::CorruptedPage {
        page_id: page_id.as_u32(),
        reason: reason.into(),
    }
}

impl<K: IndexKey> Walk<'_, K> {
    fn visit(
        &mut self,
        page_id: PageId,
        depth: u32,
        low: Option<K>,
        high: Option<K>,
    ) -> Result<()> {
        let pool = self.pool;
        let guard = pool.fetch_page_read(page_id)?;
        let is_root = page_id == self.meta.root_page_id;

        match guard.page_type() {
            PageType::BTreeLeaf => {
                if depth != self.meta.height {
                    return Err(corrupted(page_id, format!("leaf at depth {depth}")));
                }
                let leaf = LeafNode::<_, K>::new(guard.as_slice());
                let occupancy = leaf.occupancy();
                self.check_fill(page_id, is_root, occupancy, true)?;

                for i in 0..occupancy {
                    let key = leaf.key_at(i);
                    check_bounds(page_id, &key, low.as_ref(), high.as_ref())?;
                    if let Some(prev) = &self.last_key {
                        if prev.key_cmp(&key) == Ordering::Greater {
                            return Err(corrupted(page_id, format!("{key:?} follows {prev:?}")));
                        }
                    }
                    self.last_key = Some(key);
                }

                self.leaves.push((page_id, leaf.right_sibling()));
                self.stats.leaf_nodes += 1;
                self.stats.entries += occupancy;
                Ok(())
            }
            PageType::BTreeInternal => {
                if depth >= self.meta.height {
                    return Err(corrupted(page_id, format!("internal node at depth {depth}")));
                }
                let node = InternalNode::<_, K>::new(guard.as_slice());
                let occupancy = node.occupancy();
                self.check_fill(page_id, is_root, occupancy, false)?;

                let expected_level = u8::from(depth + 1 == self.meta.height);
                if node.level() != expected_level {
                    return Err(corrupted(
                        page_id,
                        format!("level flag {} at depth {depth}", node.level()),
                    ));
                }

                let keys: Vec<K> = (0..occupancy).map(|i| node.key_at(i)).collect();
                let children: Vec<PageId> = (0..=occupancy).map(|i| node.child_at(i)).collect();
                drop(guard);

                for key in &keys {
                    check_bounds(page_id, key, low.as_ref(), high.as_ref())?;
                }
                if keys.windows(2).any(|w| w[0].key_cmp(&w[1]) == Ordering::Greater) {
                    return Err(corrupted(page_id, "separators out of order"));
                }

                self.stats.internal_nodes += 1;
                for (i, child) in children.into_iter().enumerate() {
                    let child_low = if i == 0 { low } else { Some(keys[i - 1]) };
                    let child_high = keys.get(i).copied().or(high);
                    self.visit(child, depth + 1, child_low, child_high)?;
                }
                Ok(())
            }
            other => Err(corrupted(page_id, format!("unexpected {other:?} in tree"))),
        }
    }

    fn check_fill(
        &self,
        page_id: PageId,
        is_root: bool,
        occupancy: usize,
        leaf: bool,
    ) -> Result<()> {
        let layout = &self.meta.layout;
        let (min, max) = if leaf {
            (layout.min_leaf_fill(), layout.leaf_capacity)
        } else {
            (layout.min_internal_fill(), layout.internal_capacity)
        };
        // The root may be underfull: an empty leaf, or an internal node with
        // a single separator.
        let min = if is_root { usize::from(!leaf) } else { min };

        if occupancy < min || occupancy > max {
            return Err(corrupted(
                page_id,
                format!("occupancy {occupancy} outside {min}..={max}"),
            ));
        }
        Ok(())
    }

    fn check_chain(&self) -> Result<()> {
        for pair in self.leaves.windows(2) {
            let ((page_id, link), (next, _)) = (pair[0], pair[1]);
            if link != Some(next) {
                return Err(corrupted(page_id, format!("sibling {link:?}, expected {next}")));
            }
        }
        if let Some(&(page_id, Some(link))) = self.leaves.last() {
            return Err(corrupted(page_id, format!("last leaf links to {link}")));
        }
        Ok(())
    }
}

/// Keys of the subtree between separators `low` and `high` lie in
/// `[low, high]`; equality on the high side comes from duplicates left
/// in the left half of a split.
fn check_bounds<K: IndexKey>(
    page_id: PageId,
    key: &K,
    low: Option<&K>,
    high: Option<&K>,
) -> Result<()> {
    let below = low.is_some_and(|low| key.key_cmp(low) == Ordering::Less);
    let above = high.is_some_and(|high| key.key_cmp(high) == Ordering::Greater);
    if below || above {
        return Err(corrupted(
            page_id,
            format!("{key:?} outside separators {low:?}..={high:?}"),
        ));
    }
    Ok(())
}
