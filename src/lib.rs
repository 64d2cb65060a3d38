//! attrindex - a disk-paged B+Tree index over one attribute of a relation.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           attrindex                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Index Layer (index/btree)                  │   │
//! │  │   BTreeIndex: insert_entry, start/next/end scan          │   │
//! │  │   node codec · descent · split propagation · cursor      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Buffer Pool (buffer/)                     │   │
//! │  │   BufferPoolManager + Frame + guards + FIFO replacer     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Storage Layer (storage/)                   │   │
//! │  │          DiskManager + Page + PageHeader                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool
//! - [`index`] - The B+Tree
//! - [`relation`] - Base relations an index is built from
//!
//! # Quick Start
//! ```no_run
//! use attrindex::relation::MemRelation;
//! use attrindex::{BTreeIndex, Error, IndexConfig, Operator};
//!
//! # fn main() -> attrindex::Result<()> {
//! let mut rel = MemRelation::new("people");
//! for age in [31i32, 27, 45] {
//!     rel.push(age.to_le_bytes().to_vec());
//! }
//!
//! let mut index = BTreeIndex::<i32>::open_or_build("data", &rel, 0, IndexConfig::default())?;
//! index.start_scan(30, Operator::Gte, 50, Operator::Lt)?;
//! loop {
//!     match index.scan_next() {
//!         Ok(rid) => println!("{rid}"),
//!         Err(Error::ScanCompleted) => break,
//!         Err(e) => return Err(e),
//!     }
//! }
//! index.end_scan()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod relation;
pub mod storage;

pub use common::config::{IndexConfig, PAGE_SIZE};
pub use common::{Error, PageId, RecordId, Result};

pub use buffer::{BufferPoolManager, StatsSnapshot};
pub use index::btree::{BTreeIndex, Datatype, FixedStr, IndexKey, Operator, ScanState, TreeStats};
pub use storage::DiskManager;
