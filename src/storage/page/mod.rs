//! Page types and layout.
//!
//! - [`Page`] - The raw page-sized data container
//! - [`PageHeader`] - Type tag and checksum at the start of every page
//! - [`PageType`] - Metadata, internal node, or leaf node

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::Page;
pub use page_header::{PageHeader, PageType};
