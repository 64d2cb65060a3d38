//! Storage layer - file I/O and page formats.
//!
//! - [`DiskManager`] - Page-granular file I/O
//! - [`page`] - Page container and header

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
