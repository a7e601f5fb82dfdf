// In-memory FAT16 allocation table
// 16-bit little-endian cluster links, loaded once per volume

use super::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use fatlens_core::{FatError, FatResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatTable {
    entries: Vec<u16>,
}

impl FatTable {
    /// Decode a raw table region. A trailing odd byte is ignored.
    pub fn from_bytes(raw: &[u8]) -> FatResult<Self> {
        let count = raw.len() / 2;
        let mut entries = Vec::new();
        entries.try_reserve_exact(count)?;
        entries.resize(count, 0);
        LittleEndian::read_u16_into(&raw[..count * 2], &mut entries);
        Ok(Self { entries })
    }

    /// Raw link stored for `cluster`
    pub fn entry(&self, cluster: u16) -> FatResult<u16> {
        self.entries.get(cluster as usize).copied().ok_or_else(|| {
            FatError::OutOfRange(format!(
                "cluster {} beyond allocation table of {} entries",
                cluster,
                self.entries.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[u16] {
        &self.entries
    }
}

/// Values at or above 0xFFF8 terminate a chain
pub fn is_end_of_chain(value: u16) -> bool {
    value >= FAT16_EOC
}

/// Links that never point at data: free, reserved, and the 0xFFF0-0xFFF7
/// reserved/bad range.
pub fn is_unusable_link(value: u16) -> bool {
    value < FIRST_DATA_CLUSTER || (FAT16_RESERVED_START..=FAT16_BAD).contains(&value)
}
