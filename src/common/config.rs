//! Configuration for attrindex.
//!
//! Layout constants are fixed at compile time; everything a caller may want
//! to tune per index lives in [`IndexConfig`].

/// Size of a page in bytes (4KB).
///
/// Every node of the tree occupies exactly one page, so this value bounds
/// the fanout of both node kinds. Pages are 4096-aligned in memory.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames in the buffer pool when no size is configured.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Fewest frames an index will run with.
///
/// A split pins the node and its new sibling, and a scan crossing leaves pins
/// both leaves for a moment; one more frame keeps the metadata page loadable.
pub const MIN_POOL_SIZE: usize = 3;

/// Width in bytes of a fixed-width string key.
///
/// Longer strings are truncated, shorter ones are zero padded.
pub const STRING_KEY_SIZE: usize = 10;

/// Bytes reserved for the relation name in the metadata page.
pub const RELATION_NAME_SIZE: usize = 20;

/// Smallest node capacity a configuration may request.
///
/// With fewer than two entries per node a split cannot leave both halves
/// non-empty.
pub const MIN_NODE_CAPACITY: usize = 2;

/// Runtime knobs for one index instance.
///
/// # Example
/// ```
/// use attrindex::IndexConfig;
///
/// let config = IndexConfig::default()
///     .with_pool_size(16)
///     .with_leaf_capacity(4)
///     .with_internal_capacity(3);
/// assert_eq!(config.pool_size, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Frames in the buffer pool backing the index file.
    pub pool_size: usize,
    /// Upper bound on entries per leaf. `None` uses the derived maximum.
    pub leaf_capacity: Option<usize>,
    /// Upper bound on keys per internal node. `None` uses the derived maximum.
    pub internal_capacity: Option<usize>,
}

impl IndexConfig {
    /// Set the buffer pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Cap the number of entries per leaf.
    ///
    /// Values are clamped to `[MIN_NODE_CAPACITY, derived maximum]` when the
    /// index is opened.
    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = Some(capacity);
        self
    }

    /// Cap the number of keys per internal node (fanout - 1).
    pub fn with_internal_capacity(mut self, capacity: usize) -> Self {
        self.internal_capacity = Some(capacity);
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            leaf_capacity: None,
            internal_capacity: None,
        }
    }
}
