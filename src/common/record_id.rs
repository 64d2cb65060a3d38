//! Record identifier type.

use std::fmt;

/// Locates a record in the base relation: the heap page it lives on and its
/// slot within that page.
///
/// Leaves store one `RecordId` per key. The index never dereferences it.
///
/// # Encoding (6 bytes, little-endian)
/// ```text
/// 0..4   page_number
/// 4..6   slot_number
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId {
    pub page_number: u32,
    pub slot_number: u16,
}

impl RecordId {
    /// Encoded width in bytes.
    pub const SIZE: usize = 6;

    pub fn new(page_number: u32, slot_number: u16) -> Self {
        Self {
            page_number,
            slot_number,
        }
    }

    /// Decode from the first [`RecordId::SIZE`] bytes of `data`.
    pub fn read_from(data: &[u8]) -> Self {
        let page_number = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let slot_number = u16::from_le_bytes([data[4], data[5]]);
        Self {
            page_number,
            slot_number,
        }
    }

    /// Encode into the first [`RecordId::SIZE`] bytes of `data`.
    pub fn write_to(&self, data: &mut [u8]) {
        data[0..4].copy_from_slice(&self.page_number.to_le_bytes());
        data[4..6].copy_from_slice(&self.slot_number.to_le_bytes());
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}:{})", self.page_number, self.slot_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_byte_layout() {
        let rid = RecordId::new(0x04030201, 0x0605);
        let mut buf = [0u8; RecordId::SIZE];
        rid.write_to(&mut buf);

        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(RecordId::read_from(&buf), rid);
    }

    #[test]
    fn test_record_id_ordering() {
        assert!(RecordId::new(1, 9) < RecordId::new(2, 0));
        assert!(RecordId::new(1, 1) < RecordId::new(1, 2));
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(format!("{}", RecordId::new(3, 7)), "Rid(3:7)");
    }
}
