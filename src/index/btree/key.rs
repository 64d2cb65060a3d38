//! Fixed-width key types.

use std::cmp::Ordering;
use std::fmt;

use crate::common::config::STRING_KEY_SIZE;
use crate::common::{Error, Result};

/// Attribute type recorded in the index metadata.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    Integer = 0,
    Double = 1,
    String = 2,
}

impl Datatype {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Datatype::Integer),
            1 => Some(Datatype::Double),
            2 => Some(Datatype::String),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Integer => "INTEGER",
            Datatype::Double => "DOUBLE",
            Datatype::String => "STRING",
        };
        f.write_str(name)
    }
}

/// A key the tree can store: fixed width, totally ordered, and extractable
/// from a raw record at a byte offset.
pub trait IndexKey: Copy + fmt::Debug + 'static {
    /// Tag persisted in the metadata page.
    const DATATYPE: Datatype;

    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Decode from the first `WIDTH` bytes of `bytes`.
    fn read_from(bytes: &[u8]) -> Self;

    /// Encode into the first `WIDTH` bytes of `bytes`.
    fn write_to(&self, bytes: &mut [u8]);

    /// Total order used for every comparison inside the tree.
    fn key_cmp(&self, other: &Self) -> Ordering;

    /// Extract the attribute at `offset` from a base-relation record.
    fn from_record(record: &[u8], offset: usize) -> Result<Self> {
        let end = offset
            .checked_add(Self::WIDTH)
            .filter(|&end| end <= record.len())
            .ok_or(Error::AttributeOutOfBounds {
                offset,
                width: Self::WIDTH,
                len: record.len(),
            })?;
        Ok(Self::read_from(&record[offset..end]))
    }
}

impl IndexKey for i32 {
    const DATATYPE: Datatype = Datatype::Integer;
    const WIDTH: usize = 4;

    fn read_from(bytes: &[u8]) -> Self {
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Doubles compare numerically, with `-0.0` equal to `0.0`. NaN keys sort
/// after positive infinity instead of breaking the ordering.
impl IndexKey for f64 {
    const DATATYPE: Datatype = Datatype::Double;
    const WIDTH: usize = 8;

    fn read_from(bytes: &[u8]) -> Self {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        f64::from_le_bytes(raw)
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        // Adding zero folds -0.0 into 0.0 before the total order.
        (self + 0.0).total_cmp(&(other + 0.0))
    }
}

/// A string key of exactly [`STRING_KEY_SIZE`] bytes.
///
/// Longer input is truncated and shorter input is zero padded, so ordering is
/// plain byte order over the padded value.
///
/// # Example
/// ```
/// use attrindex::FixedStr;
///
/// let a = FixedStr::new("apple");
/// let b = FixedStr::new("applesauce-with-cinnamon");
/// assert!(a < b);
/// assert_eq!(b.to_string(), "applesauce");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedStr([u8; STRING_KEY_SIZE]);

impl FixedStr {
    pub fn new(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }

    pub fn from_bytes(value: &[u8]) -> Self {
        let mut buf = [0u8; STRING_KEY_SIZE];
        let len = value.len().min(STRING_KEY_SIZE);
        buf[..len].copy_from_slice(&value[..len]);
        FixedStr(buf)
    }

    pub fn as_bytes(&self) -> &[u8; STRING_KEY_SIZE] {
        &self.0
    }
}

impl From<&str> for FixedStr {
    fn from(value: &str) -> Self {
        FixedStr::new(value)
    }
}

impl fmt::Display for FixedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(STRING_KEY_SIZE);
        f.write_str(&String::from_utf8_lossy(&self.0[..end]))
    }
}

impl fmt::Debug for FixedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedStr({:?})", self.to_string())
    }
}

impl IndexKey for FixedStr {
    const DATATYPE: Datatype = Datatype::String;
    const WIDTH: usize = STRING_KEY_SIZE;

    fn read_from(bytes: &[u8]) -> Self {
        FixedStr::from_bytes(&bytes[..STRING_KEY_SIZE])
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[..STRING_KEY_SIZE].copy_from_slice(&self.0);
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}
