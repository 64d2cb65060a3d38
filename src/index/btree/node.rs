//! Node codec: typed views over a page buffer.
//!
//! [`LeafNode`] and [`InternalNode`] never copy the page. They wrap any
//! buffer (`&[u8]` for reads, `&mut [u8]` for writes) and decode/encode
//! fields in place. Occupancy is stored explicitly and every accessor is
//! checked against it.
//!
//! # Leaf layout
//! ```text
//! 0..13    PageHeader (type = BTreeLeaf)
//! 13..15   occupancy (u16)
//! 15..19   right sibling page id (u32, 0 = none)
//! 19..     [key (W) | page_number (u32) | slot (u16)] × slots
//! ```
//!
//! # Internal layout
//! ```text
//! 0..13    PageHeader (type = BTreeInternal)
//! 13       level (1 = children are leaves, 0 = children are internal)
//! 14..16   occupancy (u16)
//! 16..     keys [W] × slots, then children [u32] × (slots + 1)
//! ```
//!
//! Both layouts keep one slot more than the node's capacity, so an insert
//! can land before the split moves half the entries out.

use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::common::config::{IndexConfig, MIN_NODE_CAPACITY, PAGE_SIZE};
use crate::common::{PageId, RecordId};
use crate::storage::page::{PageHeader, PageType};

use super::key::IndexKey;

const LEAF_OCCUPANCY: usize = PageHeader::SIZE;
const LEAF_RIGHT_SIBLING: usize = LEAF_OCCUPANCY + 2;
const LEAF_ENTRIES: usize = LEAF_RIGHT_SIBLING + 4;

const INTERNAL_LEVEL: usize = PageHeader::SIZE;
const INTERNAL_OCCUPANCY: usize = INTERNAL_LEVEL + 1;
const INTERNAL_KEYS: usize = INTERNAL_OCCUPANCY + 2;

const CHILD_SIZE: usize = 4;

/// Which side of a run of equal keys a search lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Leftmost position: route on `key <= separator`, position is the first
    /// entry `>= key`.
    Lower,
    /// Rightmost position: route on `key < separator`, position is the first
    /// entry `> key`.
    Upper,
}

impl Bias {
    /// Whether an entry at `probe` lies at or after the search position.
    #[inline]
    fn is_past<K: IndexKey>(self, probe: &K, key: &K) -> bool {
        match (self, probe.key_cmp(key)) {
            (_, Ordering::Greater) => true,
            (Bias::Lower, Ordering::Equal) => true,
            _ => false,
        }
    }
}

/// Index of the first `i` in `0..len` for which `pred(i)` holds, given that
/// `pred` is monotone (false...false true...true).
fn first_index(len: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

#[inline]
fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// ============================================================================
// Capacities
// ============================================================================

/// Node capacities in effect for one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    /// Maximum entries per leaf (`L`).
    pub leaf_capacity: usize,
    /// Maximum keys per internal node (`F - 1`).
    pub internal_capacity: usize,
}

impl NodeLayout {
    /// Physical entry slots in a leaf page.
    pub fn leaf_slots<K: IndexKey>() -> usize {
        (PAGE_SIZE - LEAF_ENTRIES) / (K::WIDTH + RecordId::SIZE)
    }

    /// Physical key slots in an internal page.
    pub fn internal_slots<K: IndexKey>() -> usize {
        (PAGE_SIZE - INTERNAL_KEYS - CHILD_SIZE) / (K::WIDTH + CHILD_SIZE)
    }

    /// Largest layout the page size allows for `K`.
    pub fn max_for<K: IndexKey>() -> Self {
        Self {
            leaf_capacity: Self::leaf_slots::<K>() - 1,
            internal_capacity: Self::internal_slots::<K>() - 1,
        }
    }

    /// Apply the caps from `config`, clamped to what fits in a page.
    pub fn for_key<K: IndexKey>(config: &IndexConfig) -> Self {
        let max = Self::max_for::<K>();
        let clamp = |requested: Option<usize>, max: usize| {
            requested.map_or(max, |cap| cap.clamp(MIN_NODE_CAPACITY, max))
        };
        Self {
            leaf_capacity: clamp(config.leaf_capacity, max.leaf_capacity),
            internal_capacity: clamp(config.internal_capacity, max.internal_capacity),
        }
    }

    /// Whether both capacities are usable for `K` on this page size.
    pub fn fits<K: IndexKey>(&self) -> bool {
        let max = Self::max_for::<K>();
        (MIN_NODE_CAPACITY..=max.leaf_capacity).contains(&self.leaf_capacity)
            && (MIN_NODE_CAPACITY..=max.internal_capacity).contains(&self.internal_capacity)
    }

    /// Fanout `F`: children of a full internal node.
    pub fn fanout(&self) -> usize {
        self.internal_capacity + 1
    }

    /// Fewest entries a non-root leaf holds after any split.
    pub fn min_leaf_fill(&self) -> usize {
        self.leaf_capacity.div_ceil(2)
    }

    /// Fewest keys a non-root internal node holds after any split.
    pub fn min_internal_fill(&self) -> usize {
        self.internal_capacity / 2
    }
}

// ============================================================================
// Leaf nodes
// ============================================================================

/// View of a leaf page.
pub struct LeafNode<B, K> {
    data: B,
    _key: PhantomData<K>,
}

impl<B: AsRef<[u8]>, K: IndexKey> LeafNode<B, K> {
    const ENTRY_SIZE: usize = K::WIDTH + RecordId::SIZE;

    pub fn new(data: B) -> Self {
        Self {
            data,
            _key: PhantomData,
        }
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    #[inline]
    fn entry_offset(index: usize) -> usize {
        LEAF_ENTRIES + index * Self::ENTRY_SIZE
    }

    pub fn occupancy(&self) -> usize {
        read_u16(self.bytes(), LEAF_OCCUPANCY) as usize
    }

    pub fn right_sibling(&self) -> Option<PageId> {
        PageId::from_link(read_u32(self.bytes(), LEAF_RIGHT_SIBLING))
    }

    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index < self.occupancy(), "leaf key {index} out of bounds");
        K::read_from(&self.bytes()[Self::entry_offset(index)..])
    }

    pub fn rid_at(&self, index: usize) -> RecordId {
        debug_assert!(index < self.occupancy(), "leaf rid {index} out of bounds");
        RecordId::read_from(&self.bytes()[Self::entry_offset(index) + K::WIDTH..])
    }

    pub fn entry_at(&self, index: usize) -> (K, RecordId) {
        (self.key_at(index), self.rid_at(index))
    }

    /// Position of `key` under `bias`, in `0..=occupancy`.
    pub fn position_of(&self, key: &K, bias: Bias) -> usize {
        first_index(self.occupancy(), |i| bias.is_past(&self.key_at(i), key))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, K: IndexKey> LeafNode<B, K> {
    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Format the buffer as an empty leaf with no sibling.
    pub fn init(&mut self) {
        PageHeader::set_page_type(self.bytes_mut(), PageType::BTreeLeaf);
        self.set_occupancy(0);
        self.set_right_sibling(None);
    }

    fn set_occupancy(&mut self, occupancy: usize) {
        debug_assert!(occupancy <= NodeLayout::leaf_slots::<K>());
        write_u16(self.bytes_mut(), LEAF_OCCUPANCY, occupancy as u16);
    }

    pub fn set_right_sibling(&mut self, sibling: Option<PageId>) {
        write_u32(self.bytes_mut(), LEAF_RIGHT_SIBLING, PageId::to_link(sibling));
    }

    fn write_entry(&mut self, index: usize, key: &K, rid: RecordId) {
        let offset = Self::entry_offset(index);
        let bytes = self.bytes_mut();
        key.write_to(&mut bytes[offset..]);
        rid.write_to(&mut bytes[offset + K::WIDTH..]);
    }

    /// Insert at `index`, shifting later entries right by one.
    ///
    /// # Panics
    /// Panics if the page has no free slot or `index > occupancy`.
    pub fn insert_at(&mut self, index: usize, key: &K, rid: RecordId) {
        let occupancy = self.occupancy();
        assert!(index <= occupancy, "leaf insert position out of bounds");
        assert!(occupancy < NodeLayout::leaf_slots::<K>(), "leaf page is full");

        let from = Self::entry_offset(index);
        let to = Self::entry_offset(occupancy);
        self.bytes_mut()
            .copy_within(from..to, from + Self::ENTRY_SIZE);
        self.write_entry(index, key, rid);
        self.set_occupancy(occupancy + 1);
    }

    /// Move entries `keep..occupancy` to the front of the empty leaf `right`.
    pub fn move_upper_into<R>(&mut self, right: &mut LeafNode<R, K>, keep: usize)
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let occupancy = self.occupancy();
        debug_assert!(keep <= occupancy);
        debug_assert_eq!(right.occupancy(), 0, "split target must be empty");

        let moved = occupancy - keep;
        let src = Self::entry_offset(keep)..Self::entry_offset(occupancy);
        let dst = Self::entry_offset(0);
        right.bytes_mut()[dst..dst + moved * Self::ENTRY_SIZE]
            .copy_from_slice(&self.bytes()[src]);

        right.set_occupancy(moved);
        self.set_occupancy(keep);
    }
}

// ============================================================================
// Internal nodes
// ============================================================================

/// View of an internal page.
pub struct InternalNode<B, K> {
    data: B,
    _key: PhantomData<K>,
}

impl<B: AsRef<[u8]>, K: IndexKey> InternalNode<B, K> {
    pub fn new(data: B) -> Self {
        Self {
            data,
            _key: PhantomData,
        }
    }

    #[inline]
    fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    #[inline]
    fn key_offset(index: usize) -> usize {
        INTERNAL_KEYS + index * K::WIDTH
    }

    #[inline]
    fn child_offset(index: usize) -> usize {
        INTERNAL_KEYS + NodeLayout::internal_slots::<K>() * K::WIDTH + index * CHILD_SIZE
    }

    pub fn occupancy(&self) -> usize {
        read_u16(self.bytes(), INTERNAL_OCCUPANCY) as usize
    }

    /// Raw level flag: 1 if the children are leaves.
    pub fn level(&self) -> u8 {
        self.bytes()[INTERNAL_LEVEL]
    }

    pub fn children_are_leaves(&self) -> bool {
        self.level() == 1
    }

    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index < self.occupancy(), "internal key {index} out of bounds");
        K::read_from(&self.bytes()[Self::key_offset(index)..])
    }

    pub fn child_at(&self, index: usize) -> PageId {
        debug_assert!(index <= self.occupancy(), "child {index} out of bounds");
        PageId::new(read_u32(self.bytes(), Self::child_offset(index)))
    }

    /// Child slot to follow for `key`: the first `i` whose separator is past
    /// `key` under `bias`, or `occupancy` when there is none.
    pub fn route(&self, key: &K, bias: Bias) -> usize {
        first_index(self.occupancy(), |i| bias.is_past(&self.key_at(i), key))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, K: IndexKey> InternalNode<B, K> {
    #[inline]
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Format the buffer as an internal node with no keys.
    pub fn init(&mut self, level: u8) {
        PageHeader::set_page_type(self.bytes_mut(), PageType::BTreeInternal);
        self.bytes_mut()[INTERNAL_LEVEL] = level;
        self.set_occupancy(0);
    }

    /// Format the buffer as a new root over two children.
    pub fn init_root(&mut self, left: PageId, separator: &K, right: PageId, level: u8) {
        self.init(level);
        self.set_child(0, left);
        self.write_key(0, separator);
        self.set_child(1, right);
        self.set_occupancy(1);
    }

    fn set_occupancy(&mut self, occupancy: usize) {
        debug_assert!(occupancy <= NodeLayout::internal_slots::<K>());
        write_u16(self.bytes_mut(), INTERNAL_OCCUPANCY, occupancy as u16);
    }

    fn write_key(&mut self, index: usize, key: &K) {
        let offset = Self::key_offset(index);
        key.write_to(&mut self.bytes_mut()[offset..]);
    }

    fn set_child(&mut self, index: usize, child: PageId) {
        write_u32(self.bytes_mut(), Self::child_offset(index), child.as_u32());
    }

    /// Insert `separator` at key slot `index` and `right_child` at child
    /// slot `index + 1`, where child `index` is the node that split.
    ///
    /// # Panics
    /// Panics if the page has no free slot or `index > occupancy`.
    pub fn insert_at(&mut self, index: usize, separator: &K, right_child: PageId) {
        let occupancy = self.occupancy();
        assert!(index <= occupancy, "internal insert position out of bounds");
        assert!(
            occupancy < NodeLayout::internal_slots::<K>(),
            "internal page is full"
        );

        let keys = Self::key_offset(index)..Self::key_offset(occupancy);
        let shifted = keys.start + K::WIDTH;
        self.bytes_mut().copy_within(keys, shifted);

        let children = Self::child_offset(index + 1)..Self::child_offset(occupancy + 1);
        let shifted = children.start + CHILD_SIZE;
        self.bytes_mut().copy_within(children, shifted);

        self.write_key(index, separator);
        self.set_child(index + 1, right_child);
        self.set_occupancy(occupancy + 1);
    }

    /// Split an overflowing node around its median key.
    ///
    /// With `n` keys and `m = n / 2`, this node keeps keys `0..m` and children
    /// `0..=m`; `right` (freshly initialized, empty) receives keys `m+1..n`
    /// and children `m+1..=n`. Key `m` is returned for the parent.
    pub fn split_into<R>(&mut self, right: &mut InternalNode<R, K>) -> K
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let occupancy = self.occupancy();
        debug_assert!(occupancy >= 2, "internal split needs two keys");
        debug_assert_eq!(right.occupancy(), 0, "split target must be empty");

        let mid = occupancy / 2;
        let median = self.key_at(mid);

        let moved_keys = occupancy - mid - 1;
        let src = Self::key_offset(mid + 1)..Self::key_offset(occupancy);
        let dst = Self::key_offset(0);
        right.bytes_mut()[dst..dst + moved_keys * K::WIDTH].copy_from_slice(&self.bytes()[src]);

        let moved_children = occupancy - mid;
        let src = Self::child_offset(mid + 1)..Self::child_offset(occupancy + 1);
        let dst = Self::child_offset(0);
        right.bytes_mut()[dst..dst + moved_children * CHILD_SIZE]
            .copy_from_slice(&self.bytes()[src]);

        right.set_occupancy(moved_keys);
        self.set_occupancy(mid);
        median
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::btree::key::FixedStr;

    fn rid(n: u32) -> RecordId {
        RecordId::new(n, (n % 7) as u16)
    }

    fn leaf_with(keys: &[i32]) -> Vec<u8> {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut leaf = LeafNode::<_, i32>::new(&mut buf[..]);
        leaf.init();
        for (i, &k) in keys.iter().enumerate() {
            leaf.insert_at(i, &k, rid(k as u32));
        }
        buf
    }

    fn internal_with(first_child: u32, entries: &[(i32, u32)]) -> Vec<u8> {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut node = InternalNode::<_, i32>::new(&mut buf[..]);
        node.init(1);
        node.set_child(0, PageId::new(first_child));
        for (i, &(k, child)) in entries.iter().enumerate() {
            node.insert_at(i, &k, PageId::new(child));
        }
        buf
    }

    #[test]
    fn test_derived_capacities() {
        assert_eq!(NodeLayout::leaf_slots::<i32>(), 407);
        assert_eq!(NodeLayout::internal_slots::<i32>(), 509);
        assert_eq!(NodeLayout::leaf_slots::<f64>(), 291);
        assert_eq!(NodeLayout::leaf_slots::<FixedStr>(), 254);

        let max = NodeLayout::max_for::<i32>();
        assert_eq!(max.leaf_capacity, 406);
        assert_eq!(max.fanout(), 509);

        // The last child pointer of a full-plus-one node still fits.
        let last_child_end = InternalNode::<&[u8], i32>::child_offset(509) + CHILD_SIZE;
        assert!(last_child_end <= PAGE_SIZE);
    }

    #[test]
    fn test_layout_clamps_config() {
        let config = IndexConfig::default()
            .with_leaf_capacity(1)
            .with_internal_capacity(100_000);
        let layout = NodeLayout::for_key::<i32>(&config);

        assert_eq!(layout.leaf_capacity, MIN_NODE_CAPACITY);
        assert_eq!(layout.internal_capacity, 508);
        assert_eq!(layout.min_leaf_fill(), 1);
        assert!(layout.fits::<i32>());
        assert!(!NodeLayout::max_for::<i32>().fits::<FixedStr>());
    }

    #[test]
    fn test_leaf_init_and_insert_keeps_order() {
        let mut buf = leaf_with(&[10, 30]);
        assert_eq!(PageHeader::page_type_of(&buf), PageType::BTreeLeaf);
        let mut leaf = LeafNode::<_, i32>::new(&mut buf[..]);

        let pos = leaf.position_of(&20, Bias::Upper);
        assert_eq!(pos, 1);
        leaf.insert_at(pos, &20, rid(20));

        let keys: Vec<i32> = (0..leaf.occupancy()).map(|i| leaf.key_at(i)).collect();
        assert_eq!(keys, vec![10, 20, 30]);
        assert_eq!(leaf.rid_at(1), rid(20));
        assert_eq!(leaf.right_sibling(), None);
    }

    #[test]
    fn test_leaf_positions_with_duplicates() {
        let buf = leaf_with(&[1, 5, 5, 5, 9]);
        let leaf = LeafNode::<_, i32>::new(&buf[..]);

        assert_eq!(leaf.position_of(&5, Bias::Lower), 1);
        assert_eq!(leaf.position_of(&5, Bias::Upper), 4);
        assert_eq!(leaf.position_of(&0, Bias::Lower), 0);
        assert_eq!(leaf.position_of(&10, Bias::Upper), 5);
    }

    #[test]
    fn test_leaf_sibling_link() {
        let mut buf = leaf_with(&[]);
        let mut leaf = LeafNode::<_, i32>::new(&mut buf[..]);

        leaf.set_right_sibling(Some(PageId::new(12)));
        assert_eq!(leaf.right_sibling(), Some(PageId::new(12)));
        leaf.set_right_sibling(None);
        assert_eq!(leaf.right_sibling(), None);
    }

    #[test]
    fn test_leaf_move_upper_into() {
        let mut left_buf = leaf_with(&[1, 2, 3, 4, 5]);
        let mut right_buf = leaf_with(&[]);
        let mut left = LeafNode::<_, i32>::new(&mut left_buf[..]);
        let mut right = LeafNode::<_, i32>::new(&mut right_buf[..]);

        left.move_upper_into(&mut right, 3);

        assert_eq!(left.occupancy(), 3);
        assert_eq!(right.occupancy(), 2);
        assert_eq!(right.entry_at(0), (4, rid(4)));
        assert_eq!(right.entry_at(1), (5, rid(5)));
    }

    #[test]
    #[should_panic(expected = "leaf page is full")]
    fn test_leaf_insert_into_full_page_panics() {
        let keys: Vec<i32> = (0..NodeLayout::leaf_slots::<i32>() as i32).collect();
        let mut buf = leaf_with(&keys);
        LeafNode::<_, i32>::new(&mut buf[..]).insert_at(0, &-1, rid(0));
    }

    #[test]
    fn test_internal_routing() {
        let buf = internal_with(100, &[(10, 101), (20, 102), (20, 103)]);
        let node = InternalNode::<_, i32>::new(&buf[..]);

        assert!(node.children_are_leaves());
        assert_eq!(node.occupancy(), 3);
        assert_eq!(node.route(&5, Bias::Upper), 0);
        assert_eq!(node.route(&10, Bias::Upper), 1);
        assert_eq!(node.route(&10, Bias::Lower), 0);
        assert_eq!(node.route(&20, Bias::Upper), 3);
        assert_eq!(node.route(&20, Bias::Lower), 1);
        assert_eq!(node.route(&99, Bias::Lower), 3);
        assert_eq!(node.child_at(3), PageId::new(103));
    }

    #[test]
    fn test_internal_insert_in_middle() {
        let mut buf = internal_with(100, &[(10, 101), (30, 103)]);
        let mut node = InternalNode::<_, i32>::new(&mut buf[..]);

        // Child 1 (page 101) split, its new right half is page 102.
        node.insert_at(1, &20, PageId::new(102));

        let keys: Vec<i32> = (0..node.occupancy()).map(|i| node.key_at(i)).collect();
        let children: Vec<u32> = (0..=node.occupancy())
            .map(|i| node.child_at(i).as_u32())
            .collect();
        assert_eq!(keys, vec![10, 20, 30]);
        assert_eq!(children, vec![100, 101, 102, 103]);
    }

    #[test]
    fn test_internal_split_promotes_median() {
        let mut left_buf = internal_with(100, &[(10, 101), (20, 102), (30, 103), (40, 104)]);
        let mut right_buf = vec![0u8; PAGE_SIZE];
        let mut left = InternalNode::<_, i32>::new(&mut left_buf[..]);
        let mut right = InternalNode::<_, i32>::new(&mut right_buf[..]);
        right.init(left.level());

        let median = left.split_into(&mut right);

        assert_eq!(median, 30);
        assert_eq!(left.occupancy(), 2);
        assert_eq!((left.key_at(0), left.key_at(1)), (10, 20));
        assert_eq!(left.child_at(2), PageId::new(102));

        assert_eq!(right.occupancy(), 1);
        assert_eq!(right.key_at(0), 40);
        assert_eq!(right.child_at(0), PageId::new(103));
        assert_eq!(right.child_at(1), PageId::new(104));
        assert!(right.children_are_leaves());
    }

    #[test]
    fn test_internal_init_root() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut root = InternalNode::<_, FixedStr>::new(&mut buf[..]);
        root.init_root(PageId::new(1), &FixedStr::new("m"), PageId::new(2), 0);

        assert_eq!(root.occupancy(), 1);
        assert!(!root.children_are_leaves());
        assert_eq!(root.route(&FixedStr::new("a"), Bias::Upper), 0);
        assert_eq!(root.route(&FixedStr::new("m"), Bias::Upper), 1);
        assert_eq!(PageHeader::page_type_of(&buf), PageType::BTreeInternal);
    }
}
