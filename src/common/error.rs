//! Error types for attrindex.

use thiserror::Error;

use crate::index::btree::Operator;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the index or its storage layers can report.
///
/// Usage errors (bad scan arguments, scan lifecycle misuse) and terminal
/// conditions (empty range, exhausted scan) are distinct variants so callers
/// can match on them. Storage faults pass through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Every frame in the buffer pool is pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// Unpin of a page that is not resident or has no outstanding pins.
    #[error("Page {0} is not pinned")]
    PageNotPinned(u32),

    /// Stored checksum does not match the page contents.
    #[error("Checksum mismatch on page {0}")]
    ChecksumMismatch(u32),

    /// A page does not carry the layout the tree expected at this position.
    #[error("Page {page_id} is corrupted: {reason}")]
    CorruptedPage { page_id: u32, reason: String },

    /// An existing index file describes a different attribute.
    #[error("Index metadata mismatch on {field}: expected {expected}, found {found}")]
    InvalidMetadata {
        field: &'static str,
        expected: String,
        found: String,
    },

    /// `start_scan` got a low operator that is not GT/GTE or a high operator
    /// that is not LT/LTE.
    #[error("Invalid scan operators: low {low:?}, high {high:?}")]
    InvalidOperators { low: Operator, high: Operator },

    /// `start_scan` got a low bound greater than its high bound.
    #[error("Invalid scan range: low bound exceeds high bound")]
    InvalidRange,

    /// No stored key satisfies the requested range.
    #[error("No key in the index satisfies the scan range")]
    NoMatchingKey,

    /// `scan_next` or `end_scan` without a started scan.
    #[error("Scan has not been initialized")]
    ScanNotInitialized,

    /// `scan_next` after the last qualifying entry was returned.
    #[error("Index scan completed")]
    ScanCompleted,

    /// A base-relation record is too short to contain the indexed attribute.
    #[error("Attribute at offset {offset} (width {width}) exceeds record of {len} bytes")]
    AttributeOutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// The attribute offset does not fit the 32-bit metadata field.
    #[error("Attribute offset {0} exceeds the maximum of {max}", max = u32::MAX)]
    AttributeOffsetTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "Page 42 not found");

        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "No free frames available in buffer pool");

        let err = Error::InvalidOperators {
            low: Operator::Lt,
            high: Operator::Gt,
        };
        assert_eq!(format!("{}", err), "Invalid scan operators: low Lt, high Gt");

        let err = Error::AttributeOffsetTooLarge(1 << 40);
        assert_eq!(
            format!("{}", err),
            "Attribute offset 1099511627776 exceeds the maximum of 4294967295"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_metadata_mismatch_display() {
        let err = Error::InvalidMetadata {
            field: "attribute offset",
            expected: "4".to_string(),
            found: "8".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Index metadata mismatch on attribute offset: expected 4, found 8"
        );
    }
}
