//! System Description Table (SDT) header and checksum utilities.

/// Standard ACPI System Description Table header.
///
/// This 36-byte header starts every ACPI table. For a definition block the
/// AML term list follows it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    /// Revision of the table structure.
    pub revision: u8,
    /// Checksum byte. The entire table, including the header, must sum to zero.
    pub checksum: u8,
    /// OEM-supplied identification string.
    pub oem_id: [u8; 6],
    /// OEM-supplied table identification string.
    pub oem_table_id: [u8; 8],
    /// OEM-supplied revision number.
    pub oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    pub creator_id: u32,
    /// Revision of the utility that created the table.
    pub creator_revision: u32,
}

/// Offset of the checksum byte within the header.
pub const CHECKSUM_OFFSET: usize = 9;

impl SdtHeader {
    /// The size of an SDT header in bytes.
    pub const SIZE: usize = 36;

    /// Builds a header with the given signature and OEM identification.
    /// Length and checksum are left at zero; serialization fills them in.
    #[must_use]
    pub const fn new(signature: [u8; 4], revision: u8, oem_id: [u8; 6], oem_table_id: [u8; 8], oem_revision: u32) -> Self {
        Self {
            signature,
            length: 0,
            revision,
            checksum: 0,
            oem_id,
            oem_table_id,
            oem_revision,
            creator_id: 0,
            creator_revision: 0,
        }
    }

    /// Read an [`SdtHeader`] from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than [`SdtHeader::SIZE`] bytes.
    #[must_use]
    pub fn read_from_bytes(data: &[u8]) -> Option<Self> {
        let data = data.get(..Self::SIZE)?;
        let u32_at = |off: usize| u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]]);

        let mut header = Self {
            length: u32_at(4),
            revision: data[8],
            checksum: data[9],
            oem_revision: u32_at(24),
            creator_id: u32_at(28),
            creator_revision: u32_at(32),
            ..Self::default()
        };
        header.signature.copy_from_slice(&data[0..4]);
        header.oem_id.copy_from_slice(&data[10..16]);
        header.oem_table_id.copy_from_slice(&data[16..24]);
        Some(header)
    }

    /// Writes the header in its 36-byte wire layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.signature);
        out[4..8].copy_from_slice(&self.length.to_le_bytes());
        out[8] = self.revision;
        out[9] = self.checksum;
        out[10..16].copy_from_slice(&self.oem_id);
        out[16..24].copy_from_slice(&self.oem_table_id);
        out[24..28].copy_from_slice(&self.oem_revision.to_le_bytes());
        out[28..32].copy_from_slice(&self.creator_id.to_le_bytes());
        out[32..36].copy_from_slice(&self.creator_revision.to_le_bytes());
        out
    }
}

/// Sum of all bytes, modulo 256.
#[must_use]
pub fn byte_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Validate the checksum of a byte slice.
///
/// ACPI tables are designed so that the sum of all bytes in the table equals
/// zero (mod 256).
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    byte_sum(data) == 0
}

/// Recomputes the checksum byte of a complete table in place.
///
/// The checksum byte is zeroed, then set so the whole table sums to zero.
/// Tables shorter than a header are left untouched.
pub fn update_checksum(table: &mut [u8]) {
    if table.len() < SdtHeader::SIZE {
        return;
    }
    table[CHECKSUM_OFFSET] = 0;
    table[CHECKSUM_OFFSET] = 0u8.wrapping_sub(byte_sum(table));
}
