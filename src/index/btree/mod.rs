//! Disk-paged B+Tree over one fixed-width attribute.
//!
//! # Structure
//! ```text
//!              page 0: IndexMetadata ──▶ root
//!                                         │
//!                        ┌────────────────┴───────────────┐
//!                   [internal]                        [internal]
//!                   /    |    \                       /        \
//!              [leaf]─▶[leaf]─▶[leaf] ───────────▶ [leaf] ─▶ [leaf]
//! ```
//!
//! - [`node`] - Leaf and internal page codecs
//! - [`search`] - Root-to-leaf descent
//! - [`insert`] - Insertion, splits, root growth
//! - [`scan`] - Range scan cursor
//! - [`BTreeIndex`] - The handle tying them to a file and a buffer pool

mod index;
pub mod insert;
pub mod key;
pub mod metadata;
pub mod node;
pub mod scan;
pub mod search;
mod verify;

pub use index::{index_file_name, BTreeIndex};
pub use key::{Datatype, FixedStr, IndexKey};
pub use metadata::IndexMetadata;
pub use node::{Bias, NodeLayout};
pub use scan::{Operator, ScanCursor, ScanRange, ScanState};
pub use verify::TreeStats;
