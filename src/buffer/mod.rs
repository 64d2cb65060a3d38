//! Buffer pool management.
//!
//! The buffer pool sits between the index and the disk. It keeps a fixed
//! set of frames, each holding one page, and hands out pinned access to them.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache
//! - [`Frame`] - A slot holding a page plus pin/dirty state
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pinned access
//! - [`BufferPoolStats`] - Counters
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
