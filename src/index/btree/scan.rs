//! Range scans over the leaf chain.
//!
//! A [`ScanCursor`] owns one explicit pin on the leaf it is positioned in.
//! The pin outlives each call; the page lock does not. Crossing to the right
//! sibling pins the new leaf before the old one is released.
//!
//! ```text
//!            start_scan              last match returned
//!   Idle ──────────────────▶ Active ─────────────────────▶ Exhausted
//!    ▲                         │                              │
//!    └──────── end_scan ───────┴───────── end_scan ───────────┘
//! ```

use std::cmp::Ordering;

use tracing::trace;

use crate::buffer::{BufferPoolManager, PageReadGuard};
use crate::common::{Error, PageId, RecordId, Result};

use super::key::IndexKey;
use super::metadata::IndexMetadata;
use super::node::{Bias, LeafNode};
use super::search::{descend_to_leaf, LeafHit};

/// Comparison operator for one end of a scan range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Lte,
    Gte,
    Gt,
}

/// A validated scan range.
#[derive(Debug, Clone, Copy)]
pub struct ScanRange<K> {
    low: K,
    low_op: Operator,
    high: K,
    high_op: Operator,
}

impl<K: IndexKey> ScanRange<K> {
    /// # Errors
    /// - `Error::InvalidOperators` unless `low_op` is `Gt`/`Gte` and
    ///   `high_op` is `Lt`/`Lte`
    /// - `Error::InvalidRange` if `low > high`
    pub fn new(low: K, low_op: Operator, high: K, high_op: Operator) -> Result<Self> {
        let low_ok = matches!(low_op, Operator::Gt | Operator::Gte);
        let high_ok = matches!(high_op, Operator::Lt | Operator::Lte);
        if !low_ok || !high_ok {
            return Err(Error::InvalidOperators {
                low: low_op,
                high: high_op,
            });
        }
        if low.key_cmp(&high) == Ordering::Greater {
            return Err(Error::InvalidRange);
        }
        Ok(Self {
            low,
            low_op,
            high,
            high_op,
        })
    }

    pub fn low(&self) -> &K {
        &self.low
    }

    fn above_low(&self, key: &K) -> bool {
        match (key.key_cmp(&self.low), self.low_op) {
            (Ordering::Greater, _) => true,
            (Ordering::Equal, Operator::Gte) => true,
            _ => false,
        }
    }

    /// Whether `key` lies beyond the high bound. Once true for one entry of
    /// the sorted leaf chain, it holds for every later entry.
    pub fn is_past_high(&self, key: &K) -> bool {
        match (key.key_cmp(&self.high), self.high_op) {
            (Ordering::Greater, _) => true,
            (Ordering::Equal, Operator::Lt) => true,
            _ => false,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.above_low(key) && !self.is_past_high(key)
    }
}

/// Lifecycle of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Active,
    Exhausted,
}

/// The per-index scan cursor.
#[derive(Debug)]
pub struct ScanCursor<K> {
    state: ScanState,
    /// Leaf holding our explicit pin. `None` unless `Active`.
    leaf: Option<PageId>,
    next_entry: usize,
    range: Option<ScanRange<K>>,
}

impl<K: IndexKey> Default for ScanCursor<K> {
    fn default() -> Self {
        Self {
            state: ScanState::Idle,
            leaf: None,
            next_entry: 0,
            range: None,
        }
    }
}

impl<K: IndexKey> ScanCursor<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Position the cursor on the first entry inside `range`.
    ///
    /// Any scan in progress is ended first.
    ///
    /// # Errors
    /// `Error::NoMatchingKey` if no stored key falls inside the range; the
    /// cursor is left `Idle`.
    pub fn start(
        &mut self,
        pool: &BufferPoolManager,
        meta: &IndexMetadata,
        range: ScanRange<K>,
    ) -> Result<()> {
        if self.state != ScanState::Idle {
            self.end(pool)?;
        }

        let LeafHit {
            mut guard,
            mut position,
        } = descend_to_leaf::<K, PageReadGuard>(
            pool,
            meta.root_page_id,
            meta.height,
            range.low(),
            Bias::Lower,
            None,
        )?;

        loop {
            let leaf = LeafNode::<_, K>::new(guard.as_slice());
            while position < leaf.occupancy() {
                let key = leaf.key_at(position);
                if range.is_past_high(&key) {
                    return Err(Error::NoMatchingKey);
                }
                if range.contains(&key) {
                    let leaf_id = guard.page_id();
                    pool.pin_page(leaf_id)?;
                    trace!(leaf = %leaf_id, position, "scan started");

                    self.state = ScanState::Active;
                    self.leaf = Some(leaf_id);
                    self.next_entry = position;
                    self.range = Some(range);
                    return Ok(());
                }
                position += 1;
            }

            let Some(sibling) = leaf.right_sibling() else {
                return Err(Error::NoMatchingKey);
            };
            guard = pool.fetch_page_read(sibling)?;
            position = 0;
        }
    }

    /// Return the next matching record id.
    ///
    /// # Errors
    /// - `Error::ScanNotInitialized` if no scan was started
    /// - `Error::ScanCompleted` once every match has been returned
    pub fn next(&mut self, pool: &BufferPoolManager) -> Result<RecordId> {
        match self.state {
            ScanState::Idle => return Err(Error::ScanNotInitialized),
            ScanState::Exhausted => return Err(Error::ScanCompleted),
            ScanState::Active => {}
        }
        let (Some(mut leaf_id), Some(range)) = (self.leaf, self.range) else {
            return Err(Error::ScanNotInitialized);
        };

        loop {
            let guard = pool.fetch_page_read(leaf_id)?;
            let leaf = LeafNode::<_, K>::new(guard.as_slice());
            let occupancy = leaf.occupancy();
            let sibling = leaf.right_sibling();

            if self.next_entry < occupancy {
                let (key, rid) = leaf.entry_at(self.next_entry);
                drop(guard);

                if !range.contains(&key) {
                    self.exhaust(pool)?;
                    return Err(Error::ScanCompleted);
                }

                self.next_entry += 1;
                if self.next_entry == occupancy && sibling.is_none() {
                    self.exhaust(pool)?;
                }
                return Ok(rid);
            }
            drop(guard);

            let Some(sibling) = sibling else {
                self.exhaust(pool)?;
                return Err(Error::ScanCompleted);
            };
            pool.pin_page(sibling)?;
            pool.unpin_page(leaf_id, false)?;
            trace!(from = %leaf_id, to = %sibling, "scan crossed leaf");

            leaf_id = sibling;
            self.leaf = Some(sibling);
            self.next_entry = 0;
        }
    }

    /// Release the cursor's pin and return to `Idle`.
    ///
    /// # Errors
    /// `Error::ScanNotInitialized` if the cursor is already idle.
    pub fn end(&mut self, pool: &BufferPoolManager) -> Result<()> {
        if self.state == ScanState::Idle {
            return Err(Error::ScanNotInitialized);
        }
        let leaf = self.leaf.take();
        *self = Self::default();
        if let Some(leaf_id) = leaf {
            pool.unpin_page(leaf_id, false)?;
        }
        Ok(())
    }

    fn exhaust(&mut self, pool: &BufferPoolManager) -> Result<()> {
        self.state = ScanState::Exhausted;
        if let Some(leaf_id) = self.leaf.take() {
            pool.unpin_page(leaf_id, false)?;
        }
        Ok(())
    }
}
